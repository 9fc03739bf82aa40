//! Tick data as returned by the terminal

use crate::values::{Price, Timestamp};
use serde::{Deserialize, Serialize};

/// A single quote/trade tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Tick time (UTC)
    pub time: Timestamp,
    pub bid: Price,
    pub ask: Price,
    /// Last trade price, zero when the venue publishes quotes only
    pub last: Price,
    /// Last trade volume
    pub volume: u64,
}
