//! Connection manager and guard
//!
//! State machine: Disconnected -> Connecting -> Ready, with Degraded entered
//! when a terminal call fails with a connection-class error. Health is
//! re-verified lazily: a Ready connection is trusted until a call reports
//! failure; the next `acquire` after degradation forces a reconnect.

use crate::error::{ConnectionError, ConnectionResult};
use log::{debug, info, warn};
use meridian_ports::{Terminal, TerminalError};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Bounded reconnect policy: fixed attempt count, fixed delay between
/// attempts. Exhaustion surfaces an error, never an unbounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Lifecycle state of the single terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    /// Last call failed with a connection-class error; reconnect on next use
    Degraded,
}

/// Owns the one terminal handle per process.
///
/// No other component may call `connect`/`shutdown` on the terminal; they go
/// through [`ConnectionManager::acquire`] and use the guard for exactly one
/// call at a time.
pub struct ConnectionManager<T: Terminal> {
    terminal: Arc<T>,
    /// The single coarse call lock - one terminal call in flight, ever
    call_lock: Mutex<()>,
    state: StdMutex<ConnectionState>,
    policy: RetryPolicy,
}

impl<T: Terminal> ConnectionManager<T> {
    pub fn new(terminal: Arc<T>, policy: RetryPolicy) -> Self {
        Self {
            terminal,
            call_lock: Mutex::new(()),
            state: StdMutex::new(ConnectionState::Disconnected),
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().expect("connection state lock poisoned")
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().expect("connection state lock poisoned") = next;
    }

    /// Record a connection-class failure; the next `acquire` reconnects
    pub fn mark_degraded(&self) {
        warn!("terminal connection degraded; will reconnect on next use");
        self.set_state(ConnectionState::Degraded);
    }

    /// Wait for exclusive terminal access, reconnecting first if needed.
    ///
    /// Blocks only while waiting for the lock or during the bounded retry
    /// sequence; retry exhaustion returns an error rather than hanging.
    pub async fn acquire(&self) -> ConnectionResult<ConnectionGuard<'_, T>> {
        let permit = self.call_lock.lock().await;
        // Reconnects run under the lock so concurrent callers cannot race
        // the terminal's lifecycle.
        self.ensure_ready().await?;
        Ok(ConnectionGuard {
            manager: self,
            _permit: permit,
        })
    }

    /// Gracefully close the session
    pub async fn shutdown(&self) {
        let _permit = self.call_lock.lock().await;
        self.terminal.shutdown().await;
        self.set_state(ConnectionState::Disconnected);
        info!("terminal session closed");
    }

    async fn ensure_ready(&self) -> ConnectionResult<()> {
        match self.state() {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Degraded => {
                if self.terminal.health_check().await {
                    debug!("degraded connection passed health check");
                    self.set_state(ConnectionState::Ready);
                    return Ok(());
                }
                self.reconnect().await
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => self.reconnect().await,
        }
    }

    async fn reconnect(&self) -> ConnectionResult<()> {
        self.set_state(ConnectionState::Connecting);
        let mut last_error = String::new();

        for attempt in 1..=self.policy.attempts {
            match self.terminal.connect().await {
                Ok(()) => {
                    info!("terminal connected (attempt {attempt})");
                    self.set_state(ConnectionState::Ready);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "terminal connect attempt {attempt}/{} failed: {e}",
                        self.policy.attempts
                    );
                    last_error = e.to_string();
                    if attempt < self.policy.attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        Err(ConnectionError::RetriesExhausted {
            attempts: self.policy.attempts,
            last_error,
        })
    }
}

/// Exclusive scope for one terminal call.
///
/// Holds the manager's lock until dropped; dropping on an error path
/// releases it the same as on success.
pub struct ConnectionGuard<'a, T: Terminal> {
    manager: &'a ConnectionManager<T>,
    _permit: MutexGuard<'a, ()>,
}

impl<'a, T: Terminal> ConnectionGuard<'a, T> {
    pub fn terminal(&self) -> &T {
        &self.manager.terminal
    }

    /// Classify an upstream failure: connection-class errors degrade the
    /// manager so the next caller triggers a reconnect.
    pub fn report_failure(&self, error: &TerminalError) {
        if error.is_connection_class() {
            self.manager.mark_degraded();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Timeframe;
    use meridian_ports::Terminal;
    use meridian_terminal_sim::SimTerminal;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(1),
        }
    }

    fn manager() -> ConnectionManager<SimTerminal> {
        let _ = env_logger::try_init();
        ConnectionManager::new(Arc::new(SimTerminal::with_defaults()), fast_policy())
    }

    #[tokio::test]
    async fn acquire_connects_on_first_use() {
        let mgr = manager();
        assert_eq!(mgr.state(), ConnectionState::Disconnected);

        let guard = mgr.acquire().await.unwrap();
        assert!(guard.terminal().health_check().await);
        drop(guard);
        assert_eq!(mgr.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let terminal = Arc::new(SimTerminal::with_defaults());
        terminal.fail_next_connects(10);
        let mgr = ConnectionManager::new(Arc::clone(&terminal), fast_policy());

        let err = mgr.acquire().await.err().expect("retries should exhaust");
        assert!(matches!(
            err,
            ConnectionError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(terminal.counters().connects, 3);
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn transient_connect_failure_recovers() {
        let terminal = Arc::new(SimTerminal::with_defaults());
        terminal.fail_next_connects(2);
        let mgr = ConnectionManager::new(Arc::clone(&terminal), fast_policy());

        assert!(mgr.acquire().await.is_ok());
        assert_eq!(mgr.state(), ConnectionState::Ready);
        assert_eq!(terminal.counters().connects, 3);
    }

    #[tokio::test]
    async fn degraded_connection_reconnects_on_next_acquire() {
        let terminal = Arc::new(SimTerminal::with_defaults());
        let mgr = ConnectionManager::new(Arc::clone(&terminal), fast_policy());

        drop(mgr.acquire().await.unwrap());
        terminal.shutdown().await; // session dies behind our back
        mgr.mark_degraded();

        let guard = mgr.acquire().await.unwrap();
        assert!(guard.terminal().health_check().await);
        drop(guard);
        assert_eq!(mgr.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn report_failure_degrades_only_connection_class() {
        let mgr = manager();
        let guard = mgr.acquire().await.unwrap();

        guard.report_failure(&TerminalError::SymbolUnknown("EURUSX".to_string()));
        drop(guard);
        assert_eq!(mgr.state(), ConnectionState::Ready);

        let guard = mgr.acquire().await.unwrap();
        guard.report_failure(&TerminalError::ConnectionLost("boom".to_string()));
        drop(guard);
        assert_eq!(mgr.state(), ConnectionState::Degraded);
    }

    #[tokio::test]
    async fn concurrent_acquires_are_serialized() {
        let terminal = Arc::new(SimTerminal::with_defaults());
        let mgr = Arc::new(ConnectionManager::new(Arc::clone(&terminal), fast_policy()));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let mgr = Arc::clone(&mgr);
            handles.push(tokio::spawn(async move {
                let guard = mgr.acquire().await.unwrap();
                guard
                    .terminal()
                    .bars_from_pos("EURUSD", Timeframe::M1, 0, 5)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let counters = terminal.counters();
        assert_eq!(counters.bars, 50);
        assert_eq!(counters.max_occupancy, 1, "terminal saw overlapping calls");
    }
}
