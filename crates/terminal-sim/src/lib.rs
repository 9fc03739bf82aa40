//! Meridian Terminal Simulator
//!
//! A deterministic in-process stand-in for the external market-data terminal.
//! Prices are seeded random walks anchored at a fixed instant, so identical
//! queries always return identical bars. The simulator also exposes failure
//! injection and per-method call counters for the concurrency and
//! single-fetch tests in the rest of the workspace.

pub mod config;
pub mod terminal;

pub use config::{SimConfig, default_symbols};
pub use terminal::{CallCounters, SimTerminal};
