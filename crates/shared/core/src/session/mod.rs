//! Instrument and session metadata published by the terminal

use crate::values::{Price, Volume};
use serde::{Deserialize, Serialize};

/// Instrument specification, including the volume constraints the gateway
/// enforces on calculator operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub description: String,
    /// Price decimal places
    pub digits: u32,
    /// Smallest price increment
    pub point: Price,
    pub volume_min: Volume,
    pub volume_max: Volume,
    pub volume_step: Volume,
    pub contract_size: Price,
    pub currency_base: String,
    pub currency_profit: String,
    /// Current spread in points
    pub spread: i32,
    pub bid: Price,
    pub ask: Price,
}

/// Read-only account/session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub login: u64,
    pub name: String,
    pub server: String,
    pub currency: String,
    pub leverage: u32,
    pub balance: Price,
    pub equity: Price,
    pub margin: Price,
    pub margin_free: Price,
}

/// Terminal build/session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalInfo {
    pub name: String,
    pub company: String,
    pub build: u32,
    pub connected: bool,
}

/// Terminal version triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalVersion {
    pub version: u32,
    pub build: u32,
    pub release_date: String,
}
