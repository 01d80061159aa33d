//! Scalar converters bound as `as_<ident>` helpers.
//!
//! Loading is lenient in the usual JSON ways: numeric strings become
//! numbers, integral floats become integers, and `0`/`1`/`"true"`/`"false"`
//! become booleans. Dumping never fails.

use serde_json::{Number, Value};
use vc_schema::{Scalar, ScalarKind};

use crate::error::ConversionErrorKind;

/// Name of the JSON kind of `value`, used in mismatch messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(kind: ScalarKind, value: &Value) -> ConversionErrorKind {
    ConversionErrorKind::TypeMismatch {
        expected: kind.as_str(),
        found: value_kind(value),
    }
}

fn invalid(kind: ScalarKind, reason: impl Into<String>) -> ConversionErrorKind {
    ConversionErrorKind::InvalidScalar {
        ty: kind.as_str(),
        reason: reason.into(),
    }
}

fn integral(number: &Number) -> Option<f64> {
    number
        .as_f64()
        .filter(|float| float.is_finite() && float.fract() == 0.0)
}

fn load_int(value: &Value) -> Result<Scalar, ConversionErrorKind> {
    const KIND: ScalarKind = ScalarKind::Int;
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(Scalar::Int(int));
            }
            if number.is_u64() {
                return Err(invalid(KIND, format!("{number} is out of range")));
            }
            match integral(number) {
                Some(float) if float >= i64::MIN as f64 && float < i64::MAX as f64 => {
                    Ok(Scalar::Int(float as i64))
                }
                _ => Err(invalid(KIND, format!("{number} is not an integer"))),
            }
        }
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Scalar::Int)
            .map_err(|err| invalid(KIND, format!("`{text}`: {err}"))),
        _ => Err(mismatch(KIND, value)),
    }
}

fn load_uint(value: &Value) -> Result<Scalar, ConversionErrorKind> {
    const KIND: ScalarKind = ScalarKind::UInt;
    match value {
        Value::Number(number) => {
            if let Some(uint) = number.as_u64() {
                return Ok(Scalar::UInt(uint));
            }
            if number.is_i64() {
                return Err(invalid(KIND, format!("{number} is negative")));
            }
            match integral(number) {
                Some(float) if float >= 0.0 && float < u64::MAX as f64 => {
                    Ok(Scalar::UInt(float as u64))
                }
                _ => Err(invalid(KIND, format!("{number} is not an unsigned integer"))),
            }
        }
        Value::String(text) => text
            .trim()
            .parse::<u64>()
            .map(Scalar::UInt)
            .map_err(|err| invalid(KIND, format!("`{text}`: {err}"))),
        _ => Err(mismatch(KIND, value)),
    }
}

fn load_float(value: &Value) -> Result<Scalar, ConversionErrorKind> {
    const KIND: ScalarKind = ScalarKind::Float;
    match value {
        Value::Number(number) => number
            .as_f64()
            .map(Scalar::Float)
            .ok_or_else(|| invalid(KIND, format!("{number} is not representable"))),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Scalar::Float)
            .map_err(|err| invalid(KIND, format!("`{text}`: {err}"))),
        _ => Err(mismatch(KIND, value)),
    }
}

fn load_bool(value: &Value) -> Result<Scalar, ConversionErrorKind> {
    const KIND: ScalarKind = ScalarKind::Bool;
    match value {
        Value::Bool(flag) => Ok(Scalar::Bool(*flag)),
        Value::Number(number) => match number.as_f64() {
            Some(float) if float == 0.0 => Ok(Scalar::Bool(false)),
            Some(float) if float == 1.0 => Ok(Scalar::Bool(true)),
            _ => Err(invalid(KIND, format!("{number} is neither 0 nor 1"))),
        },
        Value::String(text) => match text.trim() {
            "true" | "1" => Ok(Scalar::Bool(true)),
            "false" | "0" => Ok(Scalar::Bool(false)),
            _ => Err(invalid(KIND, format!("`{text}` is not a boolean"))),
        },
        _ => Err(mismatch(KIND, value)),
    }
}

fn load_char(value: &Value) -> Result<Scalar, ConversionErrorKind> {
    const KIND: ScalarKind = ScalarKind::Char;
    match value {
        Value::String(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(Scalar::Char(ch)),
                _ => Err(invalid(KIND, format!("`{text}` is not one character"))),
            }
        }
        _ => Err(mismatch(KIND, value)),
    }
}

fn load_str(value: &Value) -> Result<Scalar, ConversionErrorKind> {
    match value {
        Value::String(text) => Ok(Scalar::Str(text.clone())),
        Value::Number(number) => Ok(Scalar::Str(number.to_string())),
        Value::Bool(flag) => Ok(Scalar::Str(flag.to_string())),
        _ => Err(mismatch(ScalarKind::Str, value)),
    }
}

/// Reads a scalar of `kind` from a tree value.
pub fn load_scalar(value: &Value, kind: ScalarKind) -> Result<Scalar, ConversionErrorKind> {
    match kind {
        ScalarKind::Bool => load_bool(value),
        ScalarKind::Int => load_int(value),
        ScalarKind::UInt => load_uint(value),
        ScalarKind::Float => load_float(value),
        ScalarKind::Char => load_char(value),
        ScalarKind::Str => load_str(value),
    }
}

/// Writes a scalar as a tree value. Non-finite floats become `null`.
pub fn dump_scalar(scalar: Scalar) -> Value {
    match scalar {
        Scalar::Bool(flag) => Value::Bool(flag),
        Scalar::Int(int) => Value::from(int),
        Scalar::UInt(uint) => Value::from(uint),
        Scalar::Float(float) => Number::from_f64(float).map_or(Value::Null, Value::Number),
        Scalar::Char(ch) => Value::String(ch.to_string()),
        Scalar::Str(text) => Value::String(text),
    }
}

/// Turns a dumped map key into an object key.
pub(crate) fn key_string(key: Value) -> Result<String, ConversionErrorKind> {
    match key {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(ConversionErrorKind::NonStringKey),
    }
}
