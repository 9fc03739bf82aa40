//! Capability registry
//!
//! A fixed allowlist mapping operation names to terminal callables with their
//! parameter schemas. `Capability` is a closed enum of read-only operations,
//! so write/trading operations cannot be registered by construction - the
//! read-only invariant holds at compile time, not as a runtime check.
//!
//! The registry is built once at startup and never mutated by a request.

use meridian_core::{OrderSide, TickFlags, Timeframe, Timestamp};
use std::collections::BTreeMap;

/// Target callable on the terminal. Closed set; every variant is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BarsFromPos,
    BarsFrom,
    BarsRange,
    TicksFrom,
    TicksRange,
    SymbolInfo,
    SymbolTick,
    SymbolSelect,
    SymbolsTotal,
    SymbolsGet,
    AccountInfo,
    TerminalInfo,
    Version,
    CalcMargin,
    CalcProfit,
}

/// Shape of an operation's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Scalar,
    Record,
    Table,
}

/// Declared type of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
    /// Friendly timeframe name, e.g. "H1"
    Timeframe,
    /// "buy" or "sell"
    OrderSide,
    /// RFC 3339 string, "YYYY-MM-DD" date, or unix seconds
    Timestamp,
    /// "all", "info" or "trade"
    TickFlags,
}

impl ParamKind {
    pub fn expected(&self) -> &'static str {
        match self {
            ParamKind::Int => "an integer",
            ParamKind::Float => "a number",
            ParamKind::Bool => "a boolean",
            ParamKind::Str => "a string",
            ParamKind::Timeframe => "a timeframe name (e.g. \"H1\")",
            ParamKind::OrderSide => "\"buy\" or \"sell\"",
            ParamKind::Timestamp => "a timestamp (RFC 3339, date, or unix seconds)",
            ParamKind::TickFlags => "a tick filter (\"all\", \"info\", \"trade\")",
        }
    }
}

/// A validated, native-typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Timeframe(Timeframe),
    OrderSide(OrderSide),
    Timestamp(Timestamp),
    TickFlags(TickFlags),
}

/// Schema entry for one parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamValue>,
}

impl ParamSpec {
    fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    fn optional(name: &'static str, kind: ParamKind, default: Option<ParamValue>) -> Self {
        Self {
            name,
            kind,
            required: false,
            default,
        }
    }
}

/// One allowlisted read-only operation
#[derive(Debug, Clone)]
pub struct CapabilitySpec {
    pub name: &'static str,
    pub target: Capability,
    pub requires_symbol: bool,
    pub params: Vec<ParamSpec>,
    pub shape: ResultShape,
}

/// The fixed operation table
pub struct Registry {
    specs: BTreeMap<&'static str, CapabilitySpec>,
}

impl Registry {
    /// Build the standard read-only capability table.
    ///
    /// Operation names mirror the terminal's own API so agents familiar with
    /// it need no translation.
    pub fn standard() -> Self {
        let mut specs = BTreeMap::new();
        let mut register = |spec: CapabilitySpec| {
            specs.insert(spec.name, spec);
        };

        register(CapabilitySpec {
            name: "copy_rates_from_pos",
            target: Capability::BarsFromPos,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("timeframe", ParamKind::Timeframe),
                ParamSpec::optional("start_pos", ParamKind::Int, Some(ParamValue::Int(0))),
                ParamSpec::required("count", ParamKind::Int),
            ],
            shape: ResultShape::Table,
        });
        register(CapabilitySpec {
            name: "copy_rates_from",
            target: Capability::BarsFrom,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("timeframe", ParamKind::Timeframe),
                ParamSpec::required("date_from", ParamKind::Timestamp),
                ParamSpec::required("count", ParamKind::Int),
            ],
            shape: ResultShape::Table,
        });
        register(CapabilitySpec {
            name: "copy_rates_range",
            target: Capability::BarsRange,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("timeframe", ParamKind::Timeframe),
                ParamSpec::required("date_from", ParamKind::Timestamp),
                ParamSpec::required("date_to", ParamKind::Timestamp),
            ],
            shape: ResultShape::Table,
        });
        register(CapabilitySpec {
            name: "copy_ticks_from",
            target: Capability::TicksFrom,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("date_from", ParamKind::Timestamp),
                ParamSpec::required("count", ParamKind::Int),
                ParamSpec::optional(
                    "flags",
                    ParamKind::TickFlags,
                    Some(ParamValue::TickFlags(TickFlags::All)),
                ),
            ],
            shape: ResultShape::Table,
        });
        register(CapabilitySpec {
            name: "copy_ticks_range",
            target: Capability::TicksRange,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("date_from", ParamKind::Timestamp),
                ParamSpec::required("date_to", ParamKind::Timestamp),
                ParamSpec::optional(
                    "flags",
                    ParamKind::TickFlags,
                    Some(ParamValue::TickFlags(TickFlags::All)),
                ),
            ],
            shape: ResultShape::Table,
        });
        register(CapabilitySpec {
            name: "symbol_info",
            target: Capability::SymbolInfo,
            requires_symbol: true,
            params: vec![],
            shape: ResultShape::Record,
        });
        register(CapabilitySpec {
            name: "symbol_info_tick",
            target: Capability::SymbolTick,
            requires_symbol: true,
            params: vec![],
            shape: ResultShape::Record,
        });
        register(CapabilitySpec {
            name: "symbol_select",
            target: Capability::SymbolSelect,
            requires_symbol: true,
            params: vec![ParamSpec::optional(
                "enable",
                ParamKind::Bool,
                Some(ParamValue::Bool(true)),
            )],
            shape: ResultShape::Scalar,
        });
        register(CapabilitySpec {
            name: "symbols_total",
            target: Capability::SymbolsTotal,
            requires_symbol: false,
            params: vec![],
            shape: ResultShape::Scalar,
        });
        register(CapabilitySpec {
            name: "symbols_get",
            target: Capability::SymbolsGet,
            requires_symbol: false,
            params: vec![ParamSpec::optional("group", ParamKind::Str, None)],
            shape: ResultShape::Table,
        });
        register(CapabilitySpec {
            name: "account_info",
            target: Capability::AccountInfo,
            requires_symbol: false,
            params: vec![],
            shape: ResultShape::Record,
        });
        register(CapabilitySpec {
            name: "terminal_info",
            target: Capability::TerminalInfo,
            requires_symbol: false,
            params: vec![],
            shape: ResultShape::Record,
        });
        register(CapabilitySpec {
            name: "version",
            target: Capability::Version,
            requires_symbol: false,
            params: vec![],
            shape: ResultShape::Record,
        });
        register(CapabilitySpec {
            name: "order_calc_margin",
            target: Capability::CalcMargin,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("order_type", ParamKind::OrderSide),
                ParamSpec::required("volume", ParamKind::Float),
                ParamSpec::required("price", ParamKind::Float),
            ],
            shape: ResultShape::Scalar,
        });
        register(CapabilitySpec {
            name: "order_calc_profit",
            target: Capability::CalcProfit,
            requires_symbol: true,
            params: vec![
                ParamSpec::required("order_type", ParamKind::OrderSide),
                ParamSpec::required("volume", ParamKind::Float),
                ParamSpec::required("price_open", ParamKind::Float),
                ParamSpec::required("price_close", ParamKind::Float),
            ],
            shape: ResultShape::Scalar,
        });

        Self { specs }
    }

    /// Look up an operation; None for unknown names, never a panic
    pub fn resolve(&self, name: &str) -> Option<&CapabilitySpec> {
        self.specs.get(name)
    }

    /// All registered operation names
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.keys().copied().collect()
    }

    /// Render an operation's schema for validation error messages
    pub fn describe(&self, name: &str) -> Option<String> {
        let spec = self.resolve(name)?;
        let mut parts = Vec::new();
        if spec.requires_symbol {
            parts.push("symbol (required)".to_string());
        }
        for p in &spec.params {
            let requirement = if p.required { "required" } else { "optional" };
            parts.push(format!("{} ({}, {})", p.name, p.kind.expected(), requirement));
        }
        if parts.is_empty() {
            Some(format!("{name}: no parameters"))
        } else {
            Some(format!("{name}: {}", parts.join(", ")))
        }
    }

    /// Nearest registered name by Jaro-Winkler similarity
    pub fn nearest(&self, name: &str) -> Option<String> {
        self.specs
            .keys()
            .map(|candidate| (strsim::jaro_winkler(name, candidate), *candidate))
            .filter(|(score, _)| *score >= 0.7)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, candidate)| candidate.to_string())
    }
}
