//! Market data types: bars, ticks, timeframes and the in-memory frame.

pub mod bar;
pub mod frame;
pub mod tick;
pub mod timeframe;

pub use bar::Bar;
pub use frame::Frame;
pub use timeframe::Timeframe;

use serde::{Deserialize, Serialize};

/// Direction used by the theoretical margin/profit calculators.
///
/// This is the only order-related concept in the system; there is no order
/// placement anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Parse a friendly name ("buy"/"sell", any case)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Some(OrderSide::Buy),
            "sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }

    /// Valid friendly names, for error messages
    pub fn valid_names() -> &'static [&'static str] {
        &["buy", "sell"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

/// Filter applied when copying ticks from the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickFlags {
    /// All ticks
    All,
    /// Ticks with bid/ask changes only
    Info,
    /// Ticks with last/volume changes only
    Trade,
}

impl TickFlags {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(TickFlags::All),
            "info" => Some(TickFlags::Info),
            "trade" => Some(TickFlags::Trade),
            _ => None,
        }
    }

    pub fn valid_names() -> &'static [&'static str] {
        &["all", "info", "trade"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_side_parses_any_case() {
        assert_eq!(OrderSide::parse("BUY"), Some(OrderSide::Buy));
        assert_eq!(OrderSide::parse("sell"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::parse("short"), None);
    }

    #[test]
    fn tick_flags_parse() {
        assert_eq!(TickFlags::parse("Trade"), Some(TickFlags::Trade));
        assert_eq!(TickFlags::parse("everything"), None);
    }
}
