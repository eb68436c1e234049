//! Generic best-effort coercion between value types.
//!
//! Every lossy or ambiguous case is an explicit `ConversionFailure`:
//! - integer out of the target range;
//! - float with a fractional part, NaN or infinity into an integer;
//! - finite f64 outside the f32 range;
//! - text that is not an invariant-culture number, `true`/`false`, or a
//!   single character;
//! - integers that are not Unicode scalar values into `char`;
//! - anything without a rule (e.g. a list into a scalar).

use crate::error::MapError;
use crate::value::{Value, ValueType};

enum Num {
    Int(i128),
    Float(f64),
}

/// Coerce `value`, declared as `from`, into `to`. `Null` passes through.
pub fn coerce(value: Value, from: &ValueType, to: &ValueType) -> Result<Value, MapError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    coerce_inner(value, from, to).map_err(|reason| MapError::conversion(from, to, reason))
}

fn coerce_inner(value: Value, from: &ValueType, to: &ValueType) -> Result<Value, String> {
    match to {
        ValueType::Bool => to_bool(value).map(Value::Bool),
        ValueType::I32 => integer(numeric(&value)?).map(Value::I32),
        ValueType::I64 => integer(numeric(&value)?).map(Value::I64),
        ValueType::U32 => integer(numeric(&value)?).map(Value::U32),
        ValueType::U64 => integer(numeric(&value)?).map(Value::U64),
        ValueType::F32 => to_f32(numeric(&value)?).map(Value::F32),
        ValueType::F64 => Ok(Value::F64(to_f64(numeric(&value)?))),
        ValueType::Char => to_char(value).map(Value::Char),
        ValueType::String => to_text(value).map(Value::String),
        ValueType::Json => to_json(value).map(Value::Json),
        ValueType::List(elem) => {
            let from_elem = match from {
                ValueType::List(e) => e.as_ref(),
                other => other,
            };
            to_list(value, from_elem, elem).map(Value::List)
        }
    }
}

fn numeric(value: &Value) -> Result<Num, String> {
    match value {
        Value::Bool(b) => Ok(Num::Int(i128::from(*b))),
        Value::I32(v) => Ok(Num::Int(i128::from(*v))),
        Value::I64(v) => Ok(Num::Int(i128::from(*v))),
        Value::U32(v) => Ok(Num::Int(i128::from(*v))),
        Value::U64(v) => Ok(Num::Int(i128::from(*v))),
        Value::F32(v) => Ok(Num::Float(f64::from(*v))),
        Value::F64(v) => Ok(Num::Float(*v)),
        Value::Char(c) => Ok(Num::Int(i128::from(u32::from(*c)))),
        Value::String(s) => parse_number(s),
        Value::Json(serde_json::Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Num::Int(i128::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Num::Int(i128::from(u)))
            } else {
                n.as_f64()
                    .map(Num::Float)
                    .ok_or_else(|| format!("json number {n} is not representable"))
            }
        }
        Value::Json(serde_json::Value::Bool(b)) => Ok(Num::Int(i128::from(*b))),
        Value::Json(serde_json::Value::String(s)) => parse_number(s),
        other => Err(format!("{} value is not numeric", other.kind())),
    }
}

fn parse_number(s: &str) -> Result<Num, String> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i128>() {
        return Ok(Num::Int(i));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Num::Float(f)),
        _ => Err(format!("'{s}' is not a number")),
    }
}

fn integer<T: TryFrom<i128>>(num: Num) -> Result<T, String> {
    let wide = match num {
        Num::Int(i) => i,
        Num::Float(f) => {
            if !f.is_finite() {
                return Err(format!("{f} is not finite"));
            }
            if f.fract() != 0.0 {
                return Err(format!("{f} has a fractional part"));
            }
            // Saturates for huge magnitudes; the range check below rejects those.
            f as i128
        }
    };
    T::try_from(wide).map_err(|_| format!("{wide} is out of range"))
}

fn to_f64(num: Num) -> f64 {
    match num {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn to_f32(num: Num) -> Result<f32, String> {
    let wide = to_f64(num);
    if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
        return Err(format!("{wide} is out of range"));
    }
    Ok(wide as f32)
}

fn parse_bool(s: &str) -> Result<bool, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(format!("'{s}' is not a boolean"))
    }
}

fn to_bool(value: Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) | Value::Json(serde_json::Value::Bool(b)) => Ok(b),
        Value::String(s) | Value::Json(serde_json::Value::String(s)) => parse_bool(&s),
        other => match numeric(&other)? {
            Num::Int(i) => Ok(i != 0),
            Num::Float(f) if f.is_nan() => Err("NaN is not a boolean".to_string()),
            Num::Float(f) => Ok(f != 0.0),
        },
    }
}

fn single_char(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("'{s}' is not a single character")),
    }
}

fn to_char(value: Value) -> Result<char, String> {
    match value {
        Value::Char(c) => Ok(c),
        Value::String(s) | Value::Json(serde_json::Value::String(s)) => single_char(&s),
        other => {
            let code: u32 = integer(numeric(&other)?)?;
            char::from_u32(code).ok_or_else(|| format!("{code:#x} is not a unicode scalar value"))
        }
    }
}

fn to_text(value: Value) -> Result<String, String> {
    match value {
        Value::Bool(b) => Ok(b.to_string()),
        Value::I32(v) => Ok(v.to_string()),
        Value::I64(v) => Ok(v.to_string()),
        Value::U32(v) => Ok(v.to_string()),
        Value::U64(v) => Ok(v.to_string()),
        Value::F32(v) => Ok(v.to_string()),
        Value::F64(v) => Ok(v.to_string()),
        Value::Char(c) => Ok(c.to_string()),
        Value::String(s) | Value::Json(serde_json::Value::String(s)) => Ok(s),
        Value::Json(j) => Ok(j.to_string()),
        other => Err(format!("{} value has no text form", other.kind())),
    }
}

fn to_json(value: Value) -> Result<serde_json::Value, String> {
    match value {
        Value::String(s) => serde_json::from_str(&s).map_err(|e| format!("invalid json text: {e}")),
        Value::F32(f) if !f.is_finite() => Err(format!("{f} is not finite")),
        Value::F64(f) if !f.is_finite() => Err(format!("{f} is not finite")),
        other => Ok(other.to_json()),
    }
}

fn to_list(value: Value, from_elem: &ValueType, elem: &ValueType) -> Result<Vec<Value>, String> {
    let items = match value {
        Value::List(items) => items,
        Value::Json(serde_json::Value::Array(items)) => {
            return items
                .into_iter()
                .map(|item| coerce_element(Value::Json(item), &ValueType::Json, elem))
                .collect();
        }
        other => return Err(format!("{} value is not a list", other.kind())),
    };
    items
        .into_iter()
        .map(|item| coerce_element(item, from_elem, elem))
        .collect()
}

fn coerce_element(item: Value, from: &ValueType, to: &ValueType) -> Result<Value, String> {
    if item.is_null() || from == to {
        return Ok(item);
    }
    coerce_inner(item, from, to)
}
