//! Runtime values
//!
//! Everything a script statement can produce. Terminal results arrive as
//! [`OperationOutput`] and are folded into this one enum so scripts can pass
//! them between calls without caring where they came from.

use meridian_core::{Frame, Tick};
use meridian_gateway::OperationOutput;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Numeric series, e.g. a price column or an indicator output
    Series(Vec<f64>),
    /// Fetched bar table
    Frame(Frame),
    Ticks(Vec<Tick>),
    /// Symbol name list
    List(Vec<String>),
    /// Structured record (symbol info, account info, ...)
    Record(serde_json::Value),
}

impl Value {
    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Series(_) => "series",
            Value::Frame(_) => "frame",
            Value::Ticks(_) => "ticks",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Numeric series view: a series as-is, a frame's close column
    pub fn as_series(&self) -> Option<Vec<f64>> {
        match self {
            Value::Series(s) => Some(s.clone()),
            Value::Frame(frame) => Some(frame.close_series()),
            _ => None,
        }
    }

    /// Element count of any container value
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Series(s) => Some(s.len()),
            Value::Frame(frame) => Some(frame.len()),
            Value::Ticks(ticks) => Some(ticks.len()),
            Value::List(names) => Some(names.len()),
            Value::Str(s) => Some(s.len()),
            _ => None,
        }
    }

    /// JSON rendering for the response envelope
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) if f.is_finite() => json!(f),
            Value::Float(_) => serde_json::Value::Null,
            Value::Str(s) => json!(s),
            Value::Series(s) => json!(
                s.iter()
                    .map(|v| if v.is_finite() { json!(v) } else { serde_json::Value::Null })
                    .collect::<Vec<_>>()
            ),
            Value::Frame(frame) => serde_json::to_value(frame.bars()).unwrap_or_default(),
            Value::Ticks(ticks) => serde_json::to_value(ticks).unwrap_or_default(),
            Value::List(names) => json!(names),
            Value::Record(record) => record.clone(),
        }
    }
}

impl From<OperationOutput> for Value {
    fn from(output: OperationOutput) -> Self {
        match output {
            OperationOutput::Bars(frame) => Value::Frame(frame),
            OperationOutput::Ticks(ticks) => Value::Ticks(ticks),
            OperationOutput::Symbols(names) => Value::List(names),
            OperationOutput::Count(n) => Value::Int(n as i64),
            OperationOutput::Bool(b) => Value::Bool(b),
            OperationOutput::Price(p) => Value::Float(p.to_f64().unwrap_or(f64::NAN)),
            OperationOutput::Tick(tick) => {
                Value::Record(serde_json::to_value(tick).unwrap_or_default())
            }
            OperationOutput::SymbolInfo(info) => {
                Value::Record(serde_json::to_value(info).unwrap_or_default())
            }
            OperationOutput::Account(account) => {
                Value::Record(serde_json::to_value(account).unwrap_or_default())
            }
            OperationOutput::Terminal(terminal) => {
                Value::Record(serde_json::to_value(terminal).unwrap_or_default())
            }
            OperationOutput::Version(version) => {
                Value::Record(serde_json::to_value(version).unwrap_or_default())
            }
        }
    }
}
