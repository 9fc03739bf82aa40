//! Service wiring
//!
//! Builds the component graph in dependency order: terminal, connection
//! manager, symbol catalog, gateway, then the executor and pipeline that sit
//! on top. The simulated-terminal variant is the default for demos and
//! tests; `with_terminal` accepts any `Terminal` implementation.

use crate::config::ServiceConfig;
use crate::rate_limit::RateLimiter;
use crate::service::TerminalService;
use log::info;
use meridian_analytics::{
    CsvChartRenderer, DriftForecaster, MomentumClassifier, standard_indicators,
};
use meridian_connection::ConnectionManager;
use meridian_executor::{ExecutorConfig, SandboxExecutor};
use meridian_gateway::{OperationGateway, Registry, SymbolCatalog};
use meridian_pipeline::Pipeline;
use meridian_ports::Terminal;
use meridian_terminal_sim::SimTerminal;
use std::sync::Arc;

pub struct Bootstrap;

impl Bootstrap {
    /// Wire the service against the simulated terminal
    pub fn sim(config: ServiceConfig) -> TerminalService<SimTerminal> {
        Self::with_terminal(Arc::new(SimTerminal::with_defaults()), config)
    }

    /// Wire the service against any terminal implementation
    pub fn with_terminal<T: Terminal>(
        terminal: Arc<T>,
        config: ServiceConfig,
    ) -> TerminalService<T> {
        let manager = Arc::new(ConnectionManager::new(terminal, config.retry));
        let catalog = Arc::new(SymbolCatalog::new(
            Arc::clone(&manager),
            config.catalog_ttl,
        ));
        let gateway = Arc::new(OperationGateway::new(
            Registry::standard(),
            catalog,
            Arc::clone(&manager),
        ));

        let executor = SandboxExecutor::new(
            Arc::clone(&gateway),
            standard_indicators(),
            ExecutorConfig {
                max_source_len: config.max_script_len,
                ..ExecutorConfig::default()
            },
        );
        let pipeline = Pipeline::new(
            Arc::clone(&gateway),
            standard_indicators(),
            Arc::new(DriftForecaster),
            Arc::new(MomentumClassifier),
            Arc::new(CsvChartRenderer),
            config.artifact_dir.clone(),
        );

        info!(
            "service wired (catalog ttl {:?}, rate budget {})",
            config.catalog_ttl, config.rate.budget
        );
        TerminalService::new(
            manager,
            gateway,
            executor,
            pipeline,
            RateLimiter::new(config.rate),
            config.verbose_diagnostics,
        )
    }
}
