//! Live symbol catalog cache
//!
//! Symbol existence checks run against a cached copy of the terminal's
//! instrument list with a short TTL. A miss always refreshes once before
//! SymbolNotFound is declared, so a stale cache cannot produce a false
//! negative. Refreshes are single-flight: concurrent misses collapse into
//! one underlying fetch.

use crate::error::{GatewayError, GatewayResult};
use dashmap::DashMap;
use log::debug;
use meridian_connection::ConnectionManager;
use meridian_core::SymbolInfo;
use meridian_ports::Terminal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

struct Snapshot {
    fetched_at: Instant,
    names: Vec<String>,
}

/// Cached view of the terminal's instrument catalog
pub struct SymbolCatalog<T: Terminal> {
    manager: Arc<ConnectionManager<T>>,
    ttl: Duration,
    names: RwLock<Option<Snapshot>>,
    /// Single-flight guard for refreshes
    refresh: Mutex<()>,
    /// Per-symbol specs; successful lookups only, so a transient miss is
    /// never cached
    info: DashMap<String, SymbolInfo>,
}

impl<T: Terminal> SymbolCatalog<T> {
    pub fn new(manager: Arc<ConnectionManager<T>>, ttl: Duration) -> Self {
        Self {
            manager,
            ttl,
            names: RwLock::new(None),
            refresh: Mutex::new(()),
            info: DashMap::new(),
        }
    }

    /// Whether `symbol` exists, refreshing the cache on a miss
    pub async fn contains(&self, symbol: &str) -> GatewayResult<bool> {
        let observed = {
            let guard = self.names.read().await;
            match guard.as_ref() {
                Some(snapshot)
                    if snapshot.fetched_at.elapsed() < self.ttl
                        && snapshot.names.iter().any(|n| n == symbol) =>
                {
                    return Ok(true);
                }
                Some(snapshot) => Some(snapshot.fetched_at),
                None => None,
            }
        };
        // Miss or stale: refresh before giving a verdict
        self.refresh_names(observed).await?;
        let guard = self.names.read().await;
        let found = guard
            .as_ref()
            .map(|s| s.names.iter().any(|n| n == symbol))
            .unwrap_or(false);
        Ok(found)
    }

    /// Top-`n` catalog entries nearest to `symbol`, best first
    pub async fn suggest(&self, symbol: &str, n: usize) -> Vec<String> {
        let guard = self.names.read().await;
        let Some(snapshot) = guard.as_ref() else {
            return Vec::new();
        };
        let mut scored: Vec<(f64, &String)> = snapshot
            .names
            .iter()
            .map(|name| (strsim::jaro_winkler(symbol, name), name))
            .filter(|(score, _)| *score >= 0.6)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(n).map(|(_, s)| s.clone()).collect()
    }

    /// Instrument spec for a known symbol; cached after first fetch
    pub async fn symbol_info(&self, symbol: &str) -> GatewayResult<Option<SymbolInfo>> {
        if let Some(found) = self.info.get(symbol) {
            return Ok(Some(found.clone()));
        }
        let guard = self.manager.acquire().await?;
        let fetched = match guard.terminal().symbol_info(symbol).await {
            Ok(fetched) => fetched,
            Err(e) => {
                guard.report_failure(&e);
                return Err(GatewayError::Upstream {
                    operation: "symbol_info".to_string(),
                    message: e.to_string(),
                });
            }
        };
        if let Some(info) = &fetched {
            self.info.insert(symbol.to_string(), info.clone());
        }
        Ok(fetched)
    }

    /// Drop all cached entries (next check re-fetches)
    pub async fn invalidate(&self) {
        self.info.clear();
        *self.names.write().await = None;
    }

    /// Fetch a fresh name snapshot. `observed` is the snapshot generation
    /// the caller saw before deciding to refresh; if a different generation
    /// landed while waiting for the flight lock, that one serves the caller.
    async fn refresh_names(&self, observed: Option<Instant>) -> GatewayResult<()> {
        let _flight = self.refresh.lock().await;
        let current = self.names.read().await.as_ref().map(|s| s.fetched_at);
        if current != observed {
            return Ok(());
        }

        let guard = self.manager.acquire().await?;
        let names = match guard.terminal().symbol_names(None).await {
            Ok(names) => names,
            Err(e) => {
                guard.report_failure(&e);
                return Err(GatewayError::Upstream {
                    operation: "symbols_get".to_string(),
                    message: e.to_string(),
                });
            }
        };
        drop(guard);

        debug!("symbol catalog refreshed: {} instruments", names.len());
        *self.names.write().await = Some(Snapshot {
            fetched_at: Instant::now(),
            names,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_connection::RetryPolicy;
    use meridian_terminal_sim::SimTerminal;

    fn catalog() -> (Arc<SimTerminal>, SymbolCatalog<SimTerminal>) {
        let _ = env_logger::try_init();
        let terminal = Arc::new(SimTerminal::with_defaults());
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&terminal),
            RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
        ));
        (terminal.clone(), SymbolCatalog::new(manager, Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn known_symbol_hits_cache_after_first_fetch() {
        let (terminal, catalog) = catalog();
        assert!(catalog.contains("EURUSD").await.unwrap());
        assert!(catalog.contains("GBPUSD").await.unwrap());
        // One catalog fetch serves both checks
        assert_eq!(terminal.counters().catalog, 1);
    }

    #[tokio::test]
    async fn miss_refreshes_before_not_found() {
        let (terminal, catalog) = catalog();
        assert!(catalog.contains("EURUSD").await.unwrap());
        assert!(!catalog.contains("EURUSX").await.unwrap());
        // The miss forced a second fetch
        assert_eq!(terminal.counters().catalog, 2);
    }

    #[tokio::test]
    async fn suggestions_rank_nearest_first() {
        let (_, catalog) = catalog();
        catalog.contains("EURUSD").await.unwrap();
        let suggestions = catalog.suggest("EURUSX", 3).await;
        assert_eq!(suggestions.first().map(String::as_str), Some("EURUSD"));
    }

    #[tokio::test]
    async fn concurrent_misses_single_flight() {
        let (terminal, catalog) = catalog();
        let catalog = Arc::new(catalog);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let catalog = Arc::clone(&catalog);
            handles.push(tokio::spawn(async move {
                catalog.contains("EURUSD").await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        // All ten concurrent cold checks collapse into one fetch
        assert_eq!(terminal.counters().catalog, 1);
    }

    #[tokio::test]
    async fn back_to_back_misses_each_refresh() {
        let (terminal, catalog) = catalog();
        // Two misses in immediate succession: each must re-check the live
        // list before SymbolNotFound can be declared
        assert!(!catalog.contains("EURUSX").await.unwrap());
        assert!(!catalog.contains("EURUSY").await.unwrap());
        assert_eq!(terminal.counters().catalog, 2);
    }

    #[tokio::test]
    async fn invalidate_forces_a_refetch() {
        let (terminal, catalog) = catalog();
        assert!(catalog.contains("EURUSD").await.unwrap());
        catalog.invalidate().await;
        assert!(catalog.contains("EURUSD").await.unwrap());
        assert_eq!(terminal.counters().catalog, 2);
    }

    #[tokio::test]
    async fn symbol_info_cached_on_success_only() {
        let (terminal, catalog) = catalog();
        assert!(catalog.symbol_info("EURUSD").await.unwrap().is_some());
        assert!(catalog.symbol_info("EURUSD").await.unwrap().is_some());
        assert_eq!(terminal.counters().info, 1);

        assert!(catalog.symbol_info("NOPE").await.unwrap().is_none());
        assert!(catalog.symbol_info("NOPE").await.unwrap().is_none());
        // Misses are not cached
        assert_eq!(terminal.counters().info, 3);
    }
}
