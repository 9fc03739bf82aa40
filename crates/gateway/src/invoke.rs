//! Request validation and dispatch
//!
//! `OperationGateway::invoke` is the single entry point for structured
//! requests. Validation is ordered and short-circuits on the first failure:
//!
//!   1. operation lookup (with a nearest-name suggestion on miss)
//!   2. symbol validation against the live catalog
//!   3. parameter coercion against the schema, defaults applied
//!   4. domain range checks (counts, date order, volume constraints)
//!   5. one guarded terminal call
//!
//! Steps 1 and 3 never touch the connection. Corrections applied along the
//! way (volume snapping) are reported back on the invocation rather than
//! silently swallowed.

use crate::catalog::SymbolCatalog;
use crate::coerce::{adjust_volume, coerce};
use crate::error::{GatewayError, GatewayResult};
use crate::registry::{Capability, CapabilitySpec, ParamValue, Registry};
use log::{debug, info};
use meridian_connection::{ConnectionError, ConnectionManager};
use meridian_core::{
    AccountInfo, Frame, OrderSide, Price, SymbolInfo, TerminalInfo, TerminalVersion, Tick,
    TickFlags, Timeframe, Timestamp, Volume,
};
use meridian_ports::{Terminal, TerminalError};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A loosely-typed operation request as an agent sends it
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredRequest {
    pub operation: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl StructuredRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            symbol: None,
            parameters: Map::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_param(mut self, name: &str, value: Value) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }
}

/// Typed result of one dispatched operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Bars(Frame),
    Ticks(Vec<Tick>),
    SymbolInfo(SymbolInfo),
    Tick(Tick),
    Symbols(Vec<String>),
    Account(AccountInfo),
    Terminal(TerminalInfo),
    Version(TerminalVersion),
    Count(u32),
    Bool(bool),
    Price(Price),
}

/// A completed invocation: what ran, what it produced, what was corrected
#[derive(Debug, Clone)]
pub struct Invocation {
    pub operation: &'static str,
    pub output: OperationOutput,
    /// Human-readable notes for every parameter the gateway adjusted
    pub corrections: Vec<String>,
}

/// Validated, native-typed parameters keyed by schema name
struct Params(BTreeMap<&'static str, ParamValue>);

impl Params {
    fn int(&self, name: &str) -> i64 {
        match self.0.get(name) {
            Some(ParamValue::Int(i)) => *i,
            _ => unreachable!("schema guarantees '{name}' is a validated int"),
        }
    }

    fn float(&self, name: &str) -> f64 {
        match self.0.get(name) {
            Some(ParamValue::Float(f)) => *f,
            Some(ParamValue::Int(i)) => *i as f64,
            _ => unreachable!("schema guarantees '{name}' is a validated number"),
        }
    }

    fn bool(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(ParamValue::Bool(b)) => *b,
            _ => unreachable!("schema guarantees '{name}' is a validated bool"),
        }
    }

    fn opt_str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ParamValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn timeframe(&self, name: &str) -> Timeframe {
        match self.0.get(name) {
            Some(ParamValue::Timeframe(tf)) => *tf,
            _ => unreachable!("schema guarantees '{name}' is a validated timeframe"),
        }
    }

    fn side(&self, name: &str) -> OrderSide {
        match self.0.get(name) {
            Some(ParamValue::OrderSide(s)) => *s,
            _ => unreachable!("schema guarantees '{name}' is a validated order side"),
        }
    }

    fn flags(&self, name: &str) -> TickFlags {
        match self.0.get(name) {
            Some(ParamValue::TickFlags(f)) => *f,
            _ => unreachable!("schema guarantees '{name}' is a validated tick filter"),
        }
    }

    fn timestamp(&self, name: &str) -> Timestamp {
        match self.0.get(name) {
            Some(ParamValue::Timestamp(ts)) => *ts,
            _ => unreachable!("schema guarantees '{name}' is a validated timestamp"),
        }
    }
}

/// The typed façade between structured requests and the terminal
pub struct OperationGateway<T: Terminal> {
    registry: Registry,
    catalog: Arc<SymbolCatalog<T>>,
    manager: Arc<ConnectionManager<T>>,
}

impl<T: Terminal> OperationGateway<T> {
    pub fn new(
        registry: Registry,
        catalog: Arc<SymbolCatalog<T>>,
        manager: Arc<ConnectionManager<T>>,
    ) -> Self {
        Self {
            registry,
            catalog,
            manager,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn catalog(&self) -> &SymbolCatalog<T> {
        &self.catalog
    }

    /// Validate and run one operation
    pub async fn invoke(&self, request: &StructuredRequest) -> GatewayResult<Invocation> {
        let spec = self.resolve(&request.operation)?;
        debug!("invoke {}", spec.name);

        let symbol = self.validate_symbol(spec, request).await?;
        let params = self.bind_params(spec, request)?;
        let mut corrections = Vec::new();

        let output = match self
            .dispatch(spec, symbol.as_deref(), &params, &mut corrections)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                // The instrument list may change across a reconnect
                if matches!(e, GatewayError::Connection(_)) {
                    self.catalog.invalidate().await;
                }
                return Err(e);
            }
        };

        info!(
            "{} completed ({} correction(s))",
            spec.name,
            corrections.len()
        );
        Ok(Invocation {
            operation: spec.name,
            output,
            corrections,
        })
    }

    fn resolve(&self, name: &str) -> GatewayResult<&CapabilitySpec> {
        self.registry
            .resolve(name)
            .ok_or_else(|| GatewayError::UnknownOperation {
                name: name.to_string(),
                suggestion: self.registry.nearest(name),
            })
    }

    async fn validate_symbol(
        &self,
        spec: &CapabilitySpec,
        request: &StructuredRequest,
    ) -> GatewayResult<Option<String>> {
        if !spec.requires_symbol {
            return Ok(None);
        }
        let symbol = request
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::SymbolRequired {
                operation: spec.name.to_string(),
            })?
            .to_uppercase();

        if self.catalog.contains(&symbol).await? {
            Ok(Some(symbol))
        } else {
            let suggestions = self.catalog.suggest(&symbol, 3).await;
            Err(GatewayError::SymbolNotFound {
                symbol,
                suggestions,
            })
        }
    }

    fn bind_params(
        &self,
        spec: &CapabilitySpec,
        request: &StructuredRequest,
    ) -> GatewayResult<Params> {
        let mut bound = BTreeMap::new();
        for param in &spec.params {
            match request.parameters.get(param.name) {
                Some(Value::Null) | None => {
                    if let Some(default) = &param.default {
                        bound.insert(param.name, default.clone());
                    } else if param.required {
                        return Err(GatewayError::MissingParameter {
                            operation: spec.name.to_string(),
                            name: param.name.to_string(),
                            schema: self.registry.describe(spec.name).unwrap_or_default(),
                        });
                    }
                }
                Some(raw) => {
                    bound.insert(param.name, coerce(param, raw)?);
                }
            }
        }
        let params = Params(bound);
        self.check_ranges(spec, &params)?;
        Ok(params)
    }

    fn check_ranges(&self, spec: &CapabilitySpec, params: &Params) -> GatewayResult<()> {
        for name in ["count", "start_pos"] {
            if let Some(ParamValue::Int(i)) = params.0.get(name) {
                let minimum = if name == "count" { 1 } else { 0 };
                if *i < minimum || *i > u32::MAX as i64 {
                    return Err(GatewayError::OutOfRange {
                        name: name.to_string(),
                        message: format!("must be between {minimum} and {}", u32::MAX),
                    });
                }
            }
        }
        if matches!(spec.target, Capability::BarsRange | Capability::TicksRange) {
            let from = params.timestamp("date_from");
            let to = params.timestamp("date_to");
            if to < from {
                return Err(GatewayError::OutOfRange {
                    name: "date_to".to_string(),
                    message: format!("range end {to} precedes start {from}"),
                });
            }
        }
        Ok(())
    }

    /// Convert a float price parameter for the calculators
    fn price_param(name: &str, value: f64) -> GatewayResult<Price> {
        if !value.is_finite() || value <= 0.0 {
            return Err(GatewayError::OutOfRange {
                name: name.to_string(),
                message: format!("price must be positive, got {value}"),
            });
        }
        Decimal::from_f64(value).ok_or_else(|| GatewayError::OutOfRange {
            name: name.to_string(),
            message: format!("{value} is not representable"),
        })
    }

    /// Validate the calculator volume against the instrument's constraints
    async fn calc_volume(
        &self,
        symbol: &str,
        params: &Params,
        corrections: &mut Vec<String>,
    ) -> GatewayResult<Volume> {
        let requested = params.float("volume");
        let info = self.catalog.symbol_info(symbol).await?.ok_or_else(|| {
            GatewayError::SymbolNotFound {
                symbol: symbol.to_string(),
                suggestions: Vec::new(),
            }
        })?;
        let (volume, note) = adjust_volume("volume", requested, &info)?;
        if let Some(note) = note {
            corrections.push(note);
        }
        Ok(volume)
    }

    async fn dispatch(
        &self,
        spec: &CapabilitySpec,
        symbol: Option<&str>,
        params: &Params,
        corrections: &mut Vec<String>,
    ) -> GatewayResult<OperationOutput> {
        // Symbol info is served from the catalog cache; everything else is
        // one guarded terminal call.
        if spec.target == Capability::SymbolInfo {
            let symbol = symbol.unwrap_or_default();
            return match self.catalog.symbol_info(symbol).await? {
                Some(found) => Ok(OperationOutput::SymbolInfo(found)),
                None => Err(GatewayError::SymbolNotFound {
                    symbol: symbol.to_string(),
                    suggestions: self.catalog.suggest(symbol, 3).await,
                }),
            };
        }

        // Volume constraints need a catalog lookup, so resolve before taking
        // the connection.
        let calc_volume = match spec.target {
            Capability::CalcMargin | Capability::CalcProfit => {
                Some(self.calc_volume(symbol.unwrap_or_default(), params, corrections).await?)
            }
            _ => None,
        };

        let guard = self.manager.acquire().await?;
        let terminal = guard.terminal();
        let symbol = symbol.unwrap_or_default();

        let result: Result<OperationOutput, TerminalError> = match spec.target {
            Capability::BarsFromPos => terminal
                .bars_from_pos(
                    symbol,
                    params.timeframe("timeframe"),
                    params.int("start_pos") as u32,
                    params.int("count") as u32,
                )
                .await
                .map(|bars| OperationOutput::Bars(Frame::new(bars))),
            Capability::BarsFrom => terminal
                .bars_from(
                    symbol,
                    params.timeframe("timeframe"),
                    params.timestamp("date_from"),
                    params.int("count") as u32,
                )
                .await
                .map(|bars| OperationOutput::Bars(Frame::new(bars))),
            Capability::BarsRange => terminal
                .bars_range(
                    symbol,
                    params.timeframe("timeframe"),
                    params.timestamp("date_from"),
                    params.timestamp("date_to"),
                )
                .await
                .map(|bars| OperationOutput::Bars(Frame::new(bars))),
            Capability::TicksFrom => terminal
                .ticks_from(
                    symbol,
                    params.timestamp("date_from"),
                    params.int("count") as u32,
                    params.flags("flags"),
                )
                .await
                .map(OperationOutput::Ticks),
            Capability::TicksRange => terminal
                .ticks_range(
                    symbol,
                    params.timestamp("date_from"),
                    params.timestamp("date_to"),
                    params.flags("flags"),
                )
                .await
                .map(OperationOutput::Ticks),
            Capability::SymbolTick => match terminal.symbol_tick(symbol).await {
                Ok(Some(tick)) => Ok(OperationOutput::Tick(tick)),
                Ok(None) => {
                    drop(guard);
                    return Err(GatewayError::SymbolNotFound {
                        symbol: symbol.to_string(),
                        suggestions: self.catalog.suggest(symbol, 3).await,
                    });
                }
                Err(e) => Err(e),
            },
            Capability::SymbolSelect => terminal
                .symbol_select(symbol, params.bool("enable"))
                .await
                .map(OperationOutput::Bool),
            Capability::SymbolsTotal => terminal
                .symbols_total()
                .await
                .map(OperationOutput::Count),
            Capability::SymbolsGet => terminal
                .symbol_names(params.opt_str("group"))
                .await
                .map(OperationOutput::Symbols),
            Capability::AccountInfo => terminal
                .account_info()
                .await
                .map(OperationOutput::Account),
            Capability::TerminalInfo => terminal
                .terminal_info()
                .await
                .map(OperationOutput::Terminal),
            Capability::Version => terminal.version().await.map(OperationOutput::Version),
            Capability::CalcMargin => {
                let volume = calc_volume.unwrap_or_default();
                terminal
                    .calc_margin(
                        params.side("order_type"),
                        symbol,
                        volume,
                        Self::price_param("price", params.float("price"))?,
                    )
                    .await
                    .map(OperationOutput::Price)
            }
            Capability::CalcProfit => {
                let volume = calc_volume.unwrap_or_default();
                terminal
                    .calc_profit(
                        params.side("order_type"),
                        symbol,
                        volume,
                        Self::price_param("price_open", params.float("price_open"))?,
                        Self::price_param("price_close", params.float("price_close"))?,
                    )
                    .await
                    .map(OperationOutput::Price)
            }
            Capability::SymbolInfo => unreachable!("served from the catalog above"),
        };

        match result {
            Ok(output) => Ok(output),
            Err(e) => {
                guard.report_failure(&e);
                Err(classify(spec.name, e))
            }
        }
    }
}

/// Map a terminal failure onto the gateway taxonomy. Connection-class errors
/// surface as such so callers can distinguish retryable failures.
fn classify(operation: &str, error: TerminalError) -> GatewayError {
    if error.is_connection_class() {
        GatewayError::Connection(ConnectionError::Lost(error.to_string()))
    } else {
        GatewayError::Upstream {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_connection::RetryPolicy;
    use meridian_terminal_sim::SimTerminal;
    use serde_json::json;
    use std::time::Duration;

    fn gateway() -> (Arc<SimTerminal>, OperationGateway<SimTerminal>) {
        let _ = env_logger::try_init();
        let terminal = Arc::new(SimTerminal::with_defaults());
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&terminal),
            RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
        ));
        let catalog = Arc::new(SymbolCatalog::new(
            Arc::clone(&manager),
            Duration::from_secs(30),
        ));
        (
            terminal,
            OperationGateway::new(Registry::standard(), catalog, manager),
        )
    }

    #[tokio::test]
    async fn unknown_operation_never_touches_the_terminal() {
        let (terminal, gw) = gateway();
        let err = gw
            .invoke(&StructuredRequest::new("copy_rates"))
            .await
            .unwrap_err();
        match err {
            GatewayError::UnknownOperation { suggestion, .. } => {
                assert!(suggestion.is_some());
            }
            other => panic!("expected unknown operation, got {other:?}"),
        }
        assert_eq!(terminal.counters().connects, 0);
    }

    #[tokio::test]
    async fn typo_symbol_gets_suggestions() {
        let (_, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("EURUSX")
            .with_param("timeframe", json!("H1"))
            .with_param("count", json!(10));
        let err = gw.invoke(&request).await.unwrap_err();
        match err {
            GatewayError::SymbolNotFound {
                symbol,
                suggestions,
            } => {
                assert_eq!(symbol, "EURUSX");
                assert_eq!(suggestions.first().map(String::as_str), Some("EURUSD"));
            }
            other => panic!("expected symbol not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_parameter_names_the_field() {
        let (_, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("EURUSD")
            .with_param("timeframe", json!("H1"));
        let err = gw.invoke(&request).await.unwrap_err();
        match err {
            GatewayError::MissingParameter {
                name,
                operation,
                schema,
            } => {
                assert_eq!(name, "count");
                assert_eq!(operation, "copy_rates_from_pos");
                // The full schema rides along so the agent can self-correct
                assert!(schema.contains("timeframe"));
            }
            other => panic!("expected missing parameter, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rates_request_returns_exact_row_count() {
        let (_, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("eurusd") // case-normalized
            .with_param("timeframe", json!("H1"))
            .with_param("count", json!(100));
        let done = gw.invoke(&request).await.unwrap();
        match done.output {
            OperationOutput::Bars(frame) => assert_eq!(frame.len(), 100),
            other => panic!("expected bars, got {other:?}"),
        }
        assert!(done.corrections.is_empty());
    }

    #[tokio::test]
    async fn identical_requests_are_idempotent() {
        let (_, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("EURUSD")
            .with_param("timeframe", json!("M15"))
            .with_param("count", json!(50));
        let a = gw.invoke(&request).await.unwrap();
        let b = gw.invoke(&request).await.unwrap();
        assert_eq!(a.output, b.output);
    }

    #[tokio::test]
    async fn calc_margin_snaps_volume_and_reports_it() {
        let (_, gw) = gateway();
        let request = StructuredRequest::new("order_calc_margin")
            .with_symbol("EURUSD")
            .with_param("order_type", json!("buy"))
            .with_param("volume", json!(0.013))
            .with_param("price", json!(1.10));
        let done = gw.invoke(&request).await.unwrap();
        assert_eq!(done.corrections.len(), 1);
        assert!(done.corrections[0].contains("adjusted"));
        assert!(matches!(done.output, OperationOutput::Price(_)));
    }

    #[tokio::test]
    async fn invalid_enum_lists_choices() {
        let (_, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("EURUSD")
            .with_param("timeframe", json!("H7"))
            .with_param("count", json!(10));
        let err = gw.invoke(&request).await.unwrap_err();
        match err {
            GatewayError::EnumMismatch { name, valid, .. } => {
                assert_eq!(name, "timeframe");
                assert!(valid.contains(&"H4".to_string()));
            }
            other => panic!("expected enum mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reversed_range_is_rejected_before_dispatch() {
        let (terminal, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_range")
            .with_symbol("EURUSD")
            .with_param("timeframe", json!("H1"))
            .with_param("date_from", json!("2024-05-02"))
            .with_param("date_to", json!("2024-05-01"));
        let err = gw.invoke(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::OutOfRange { .. }));
        assert_eq!(terminal.counters().bars, 0);
    }

    #[tokio::test]
    async fn upstream_connection_failure_degrades_the_manager() {
        let (terminal, gw) = gateway();
        // Warm up the connection and catalog first.
        let warmup = StructuredRequest::new("symbols_total");
        gw.invoke(&warmup).await.unwrap();

        terminal.fail_next_data_calls(1);
        let err = gw.invoke(&warmup).await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));
        assert_eq!(err.kind(), "CONNECTION_FAILURE");

        // Next invoke recovers through the reconnect path.
        gw.invoke(&warmup).await.unwrap();
    }

    #[tokio::test]
    async fn connection_failure_invalidates_the_catalog() {
        let (terminal, gw) = gateway();
        let request = StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("EURUSD")
            .with_param("timeframe", json!("H1"))
            .with_param("count", json!(10));
        gw.invoke(&request).await.unwrap();
        assert_eq!(terminal.counters().catalog, 1);

        terminal.fail_next_data_calls(1);
        let err = gw.invoke(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));

        // The recovered session re-checks the live instrument list
        gw.invoke(&request).await.unwrap();
        assert_eq!(terminal.counters().catalog, 2);
    }

    #[tokio::test]
    async fn symbolless_operations_skip_symbol_validation() {
        let (_, gw) = gateway();
        let done = gw
            .invoke(&StructuredRequest::new("account_info"))
            .await
            .unwrap();
        assert!(matches!(done.output, OperationOutput::Account(_)));
    }
}
