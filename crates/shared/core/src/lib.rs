//! Meridian Core Domain
//!
//! Pure domain types for the Meridian terminal gateway.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod market;
pub mod session;
pub mod values;

// Re-export commonly used types at crate root
pub use market::{Bar, Frame, OrderSide, TickFlags, Timeframe, tick::Tick};
pub use session::{AccountInfo, SymbolInfo, TerminalInfo, TerminalVersion};
pub use values::{Price, Symbol, Timestamp, Volume};
