//! OHLC bar as returned by the terminal's history calls

use crate::values::{Price, Timestamp};
use serde::{Deserialize, Serialize};

/// A single OHLC bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time (UTC)
    pub time: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Number of ticks inside the bar
    pub tick_volume: u64,
    /// Spread in points at bar close
    pub spread: i32,
    /// Traded volume, when the venue reports it
    pub real_volume: u64,
}

impl Bar {
    pub fn new(time: Timestamp, open: Price, high: Price, low: Price, close: Price) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            tick_volume: 0,
            spread: 0,
            real_volume: 0,
        }
    }
}
