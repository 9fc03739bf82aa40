//! Parameter coercion
//!
//! Turns loosely-typed JSON values into the native types a capability schema
//! declares. Coercion is forgiving on representation ("14" for an integer,
//! unix seconds or a date for a timestamp) but strict on meaning: a value
//! that cannot be read as the declared kind is a TypeMismatch, and an enum
//! name outside the valid set is an EnumMismatch listing the whole set.

use crate::error::{GatewayError, GatewayResult};
use crate::registry::{ParamKind, ParamSpec, ParamValue};
use chrono::{DateTime, NaiveDate, Utc};
use meridian_core::{OrderSide, SymbolInfo, TickFlags, Timeframe, Timestamp, Volume};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// Coerce one JSON value against one schema entry
pub fn coerce(spec: &ParamSpec, value: &Value) -> GatewayResult<ParamValue> {
    match spec.kind {
        ParamKind::Int => coerce_int(spec, value).map(ParamValue::Int),
        ParamKind::Float => coerce_float(spec, value).map(ParamValue::Float),
        ParamKind::Bool => match value {
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            other => Err(mismatch(spec, other)),
        },
        ParamKind::Str => match value {
            Value::String(s) => Ok(ParamValue::Str(s.clone())),
            other => Err(mismatch(spec, other)),
        },
        ParamKind::Timeframe => {
            let name = as_str(spec, value)?;
            Timeframe::parse(name)
                .map(ParamValue::Timeframe)
                .ok_or_else(|| enum_mismatch(spec, name, Timeframe::valid_names()))
        }
        ParamKind::OrderSide => {
            let name = as_str(spec, value)?;
            OrderSide::parse(name)
                .map(ParamValue::OrderSide)
                .ok_or_else(|| enum_mismatch(spec, name, OrderSide::valid_names()))
        }
        ParamKind::TickFlags => {
            let name = as_str(spec, value)?;
            TickFlags::parse(name)
                .map(ParamValue::TickFlags)
                .ok_or_else(|| enum_mismatch(spec, name, TickFlags::valid_names()))
        }
        ParamKind::Timestamp => coerce_timestamp(spec, value).map(ParamValue::Timestamp),
    }
}

fn coerce_int(spec: &ParamSpec, value: &Value) -> GatewayResult<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            // Accept whole floats like 14.0
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    return Ok(f as i64);
                }
            }
            Err(mismatch(spec, value))
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| mismatch(spec, value)),
        other => Err(mismatch(spec, other)),
    }
}

fn coerce_float(spec: &ParamSpec, value: &Value) -> GatewayResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(spec, value)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| mismatch(spec, value)),
        other => Err(mismatch(spec, other)),
    }
}

/// Accepted timestamp forms: RFC 3339, a bare `YYYY-MM-DD` date (midnight
/// UTC), or unix seconds as a number.
fn coerce_timestamp(spec: &ParamSpec, value: &Value) -> GatewayResult<Timestamp> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                    return Ok(midnight.and_utc());
                }
            }
            Err(mismatch(spec, value))
        }
        Value::Number(n) => {
            let secs = n.as_i64().ok_or_else(|| mismatch(spec, value))?;
            DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
                GatewayError::OutOfRange {
                    name: spec.name.to_string(),
                    message: format!("{secs} is not a representable unix time"),
                }
            })
        }
        other => Err(mismatch(spec, other)),
    }
}

fn as_str<'v>(spec: &ParamSpec, value: &'v Value) -> GatewayResult<&'v str> {
    value.as_str().ok_or_else(|| mismatch(spec, value))
}

fn mismatch(spec: &ParamSpec, value: &Value) -> GatewayError {
    GatewayError::TypeMismatch {
        name: spec.name.to_string(),
        expected: spec.kind.expected(),
        actual: describe(value),
    }
}

fn enum_mismatch(spec: &ParamSpec, raw: &str, valid: &[&str]) -> GatewayError {
    GatewayError::EnumMismatch {
        name: spec.name.to_string(),
        value: raw.to_string(),
        valid: valid.iter().map(|v| v.to_string()).collect(),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string \"{s}\""),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// Snap a requested volume to the instrument's min/max/step grid.
///
/// Returns the usable volume plus a correction note when the request had to
/// change. Non-positive volumes are errors, not corrections.
pub fn adjust_volume(
    name: &str,
    requested: f64,
    info: &SymbolInfo,
) -> GatewayResult<(Volume, Option<String>)> {
    if !requested.is_finite() || requested <= 0.0 {
        return Err(GatewayError::OutOfRange {
            name: name.to_string(),
            message: format!("volume must be positive, got {requested}"),
        });
    }
    let requested = Decimal::from_f64(requested).ok_or_else(|| GatewayError::OutOfRange {
        name: name.to_string(),
        message: format!("volume {requested} is not representable"),
    })?;

    let mut adjusted = requested.clamp(info.volume_min, info.volume_max);
    if info.volume_step > Decimal::ZERO {
        let steps = ((adjusted - info.volume_min) / info.volume_step).round();
        adjusted = (info.volume_min + steps * info.volume_step).clamp(info.volume_min, info.volume_max);
    }

    let note = if adjusted != requested {
        Some(format!(
            "volume adjusted from {requested} to {adjusted} (min {}, max {}, step {})",
            info.volume_min, info.volume_max, info.volume_step
        ))
    } else {
        None
    };
    Ok((adjusted, note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamKind;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn spec(name: &'static str, kind: ParamKind) -> ParamSpec {
        ParamSpec {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    fn sample_info() -> SymbolInfo {
        SymbolInfo {
            name: "EURUSD".to_string(),
            description: "Euro vs US Dollar".to_string(),
            digits: 5,
            point: dec!(0.00001),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
            volume_step: dec!(0.01),
            contract_size: dec!(100000),
            currency_base: "EUR".to_string(),
            currency_profit: "USD".to_string(),
            spread: 2,
            bid: dec!(1.0840),
            ask: dec!(1.0842),
        }
    }

    #[test]
    fn int_accepts_numeric_string() {
        let s = spec("count", ParamKind::Int);
        assert_eq!(coerce(&s, &json!(100)).unwrap(), ParamValue::Int(100));
        assert_eq!(coerce(&s, &json!("100")).unwrap(), ParamValue::Int(100));
        assert_eq!(coerce(&s, &json!(14.0)).unwrap(), ParamValue::Int(14));
        assert!(matches!(
            coerce(&s, &json!(14.5)),
            Err(GatewayError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn timeframe_mismatch_lists_valid_set() {
        let s = spec("timeframe", ParamKind::Timeframe);
        assert_eq!(
            coerce(&s, &json!("h1")).unwrap(),
            ParamValue::Timeframe(Timeframe::H1)
        );
        match coerce(&s, &json!("H7")) {
            Err(GatewayError::EnumMismatch { valid, .. }) => {
                assert!(valid.contains(&"H1".to_string()));
                assert!(valid.contains(&"MN1".to_string()));
            }
            other => panic!("expected enum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn timestamp_accepts_three_forms() {
        let s = spec("date_from", ParamKind::Timestamp);
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        let ParamValue::Timestamp(a) = coerce(&s, &json!("2024-05-01T00:00:00Z")).unwrap() else {
            panic!("wrong kind");
        };
        let ParamValue::Timestamp(b) = coerce(&s, &json!("2024-05-01")).unwrap() else {
            panic!("wrong kind");
        };
        let ParamValue::Timestamp(c) = coerce(&s, &json!(expected.timestamp())).unwrap() else {
            panic!("wrong kind");
        };
        assert_eq!(a, expected);
        assert_eq!(b, expected);
        assert_eq!(c, expected);
    }

    #[test]
    fn volume_snaps_to_grid_with_note() {
        let info = sample_info();
        let (v, note) = adjust_volume("volume", 0.013, &info).unwrap();
        assert_eq!(v, dec!(0.01));
        assert!(note.unwrap().contains("adjusted"));

        let (v, note) = adjust_volume("volume", 0.5, &info).unwrap();
        assert_eq!(v, dec!(0.5));
        assert!(note.is_none());

        let (v, _) = adjust_volume("volume", 500.0, &info).unwrap();
        assert_eq!(v, dec!(100));

        assert!(adjust_volume("volume", -1.0, &info).is_err());
    }
}
