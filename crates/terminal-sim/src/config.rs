//! Simulator configuration and the default instrument catalog

use chrono::{TimeZone, Utc};
use meridian_core::{SymbolInfo, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Walk seed; same seed, same bars
    pub seed: u64,
    /// Fixed "now" the bar grid counts back from
    pub anchor: Timestamp,
    /// Instrument catalog
    pub symbols: Vec<SymbolInfo>,
    /// Account leverage used by the margin calculator
    pub leverage: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            anchor: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            symbols: default_symbols(),
            leverage: 100,
        }
    }
}

fn fx(name: &str, description: &str, base: &str, profit: &str) -> SymbolInfo {
    SymbolInfo {
        name: name.to_string(),
        description: description.to_string(),
        digits: 5,
        point: dec!(0.00001),
        volume_min: dec!(0.01),
        volume_max: dec!(500),
        volume_step: dec!(0.01),
        contract_size: dec!(100000),
        currency_base: base.to_string(),
        currency_profit: profit.to_string(),
        spread: 12,
        bid: Decimal::ZERO,
        ask: Decimal::ZERO,
    }
}

/// The built-in catalog: a handful of FX majors, gold and a crypto cross
pub fn default_symbols() -> Vec<SymbolInfo> {
    vec![
        fx("EURUSD", "Euro vs US Dollar", "EUR", "USD"),
        fx("GBPUSD", "Pound Sterling vs US Dollar", "GBP", "USD"),
        fx("AUDUSD", "Australian Dollar vs US Dollar", "AUD", "USD"),
        SymbolInfo {
            digits: 3,
            point: dec!(0.001),
            ..fx("USDJPY", "US Dollar vs Japanese Yen", "USD", "JPY")
        },
        SymbolInfo {
            digits: 2,
            point: dec!(0.01),
            volume_max: dec!(50),
            contract_size: dec!(1),
            spread: 2500,
            ..fx("BTCUSD", "Bitcoin vs US Dollar", "BTC", "USD")
        },
        SymbolInfo {
            digits: 2,
            point: dec!(0.01),
            volume_max: dec!(100),
            contract_size: dec!(100),
            spread: 35,
            ..fx("XAUUSD", "Gold vs US Dollar", "XAU", "USD")
        },
    ]
}

/// Base price each symbol's walk starts from
pub(crate) fn base_price(symbol: &str) -> f64 {
    match symbol {
        "EURUSD" => 1.085,
        "GBPUSD" => 1.27,
        "AUDUSD" => 0.665,
        "USDJPY" => 155.4,
        "BTCUSD" => 65_000.0,
        "XAUUSD" => 2_320.0,
        _ => 100.0,
    }
}
