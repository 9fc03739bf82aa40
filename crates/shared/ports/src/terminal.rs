//! The terminal port - a narrow read-only surface over the external
//! market-data terminal
//!
//! Lifecycle methods (`connect`, `shutdown`, `health_check`) exist on this
//! trait but are called exclusively by the connection manager; the capability
//! registry never exposes them to callers.

use crate::error::TerminalResult;
use async_trait::async_trait;
use meridian_core::{
    AccountInfo, Bar, OrderSide, Price, SymbolInfo, TerminalInfo, TerminalVersion, Tick, TickFlags,
    Timeframe, Timestamp, Volume,
};

#[async_trait]
pub trait Terminal: Send + Sync {
    // --- lifecycle (connection manager only) ---

    /// Establish the terminal session
    async fn connect(&self) -> TerminalResult<()>;

    /// Tear down the terminal session
    async fn shutdown(&self);

    /// Cheap liveness probe; false means the session needs a reconnect
    async fn health_check(&self) -> bool;

    // --- historical bars ---

    /// Bars counted back from a position (0 = most recent), oldest first
    async fn bars_from_pos(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: u32,
        count: u32,
    ) -> TerminalResult<Vec<Bar>>;

    /// Bars starting at a point in time, oldest first
    async fn bars_from(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: Timestamp,
        count: u32,
    ) -> TerminalResult<Vec<Bar>>;

    /// Bars inside a closed time range, oldest first
    async fn bars_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: Timestamp,
        to: Timestamp,
    ) -> TerminalResult<Vec<Bar>>;

    // --- ticks ---

    async fn ticks_from(
        &self,
        symbol: &str,
        from: Timestamp,
        count: u32,
        flags: TickFlags,
    ) -> TerminalResult<Vec<Tick>>;

    async fn ticks_range(
        &self,
        symbol: &str,
        from: Timestamp,
        to: Timestamp,
        flags: TickFlags,
    ) -> TerminalResult<Vec<Tick>>;

    // --- instrument metadata ---

    /// Full specification for one symbol; None when the symbol is unknown
    async fn symbol_info(&self, symbol: &str) -> TerminalResult<Option<SymbolInfo>>;

    /// Latest tick for one symbol; None when the symbol is unknown
    async fn symbol_tick(&self, symbol: &str) -> TerminalResult<Option<Tick>>;

    /// Show/hide a symbol in the terminal's market watch
    async fn symbol_select(&self, symbol: &str, enable: bool) -> TerminalResult<bool>;

    /// Number of instruments in the catalog
    async fn symbols_total(&self) -> TerminalResult<u32>;

    /// Instrument names, optionally filtered by a `*`-wildcard group pattern
    async fn symbol_names(&self, group: Option<&str>) -> TerminalResult<Vec<String>>;

    // --- session metadata ---

    async fn account_info(&self) -> TerminalResult<AccountInfo>;

    async fn terminal_info(&self) -> TerminalResult<TerminalInfo>;

    async fn version(&self) -> TerminalResult<TerminalVersion>;

    // --- theoretical calculators (read-only, no orders are placed) ---

    async fn calc_margin(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: Volume,
        price: Price,
    ) -> TerminalResult<Price>;

    async fn calc_profit(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: Volume,
        price_open: Price,
        price_close: Price,
    ) -> TerminalResult<Price>;
}
