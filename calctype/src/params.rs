//! Parameter access and comparison shared by the VASP and CP2K classifiers.
//!
//! Parameter mappings come from upstream parsers as loose JSON objects, so
//! every accessor here tolerates absent keys and applies the defaults the
//! classifiers expect.

use serde_json::{Map, Value};

use crate::error::ClassifyError;

/// A flat mapping of calculation parameters.
pub type Parameters = Map<String, Value>;

/// Compares an input value against a required rule value.
///
/// Strings compare trimmed and case-insensitively. Numbers compare by value,
/// so an integer `0` equals a float `0.0`, and booleans compare as the
/// numbers 0 and 1 (`LHFCALC = 1` matches `LHFCALC = true`). Everything else
/// compares exactly.
#[must_use]
pub fn variant_equal(actual: &Value, required: &Value) -> bool {
    match (actual, required) {
        (Value::Bool(b), Value::Number(n)) | (Value::Number(n), Value::Bool(b)) => {
            n.as_f64() == Some(if *b { 1.0 } else { 0.0 })
        }
        (Value::String(a), Value::String(b)) => {
            a.trim().to_uppercase() == b.trim().to_uppercase()
        }
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => actual == required,
    }
}

/// Unwraps single-element lists so `["PBE"]` behaves like `"PBE"`.
#[must_use]
pub fn unwrap_singleton(value: &Value) -> &Value {
    match value {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

/// Returns a copy of `params` with every single-element list unwrapped.
#[must_use]
pub fn normalize(params: &Parameters) -> Parameters {
    params
        .iter()
        .map(|(k, v)| (k.clone(), unwrap_singleton(v).clone()))
        .collect()
}

/// Truthiness of a loosely typed flag: null, `false`, zero, and empty
/// strings, lists, or objects are false.
#[must_use]
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Reads a numeric flag, substituting `default` when the key is absent or
/// null. Booleans read as 0 or 1.
///
/// # Errors
///
/// Returns [`ClassifyError::InvalidParameter`] for strings, lists, and objects.
pub fn number(params: &Parameters, key: &str, default: f64) -> Result<f64, ClassifyError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(key, "a number", &Value::Number(n.clone()))),
        Some(other) => Err(invalid(key, "a number", other)),
    }
}

/// Returns the object stored at `key`, or `None` when absent or null.
///
/// # Errors
///
/// Returns [`ClassifyError::InvalidParameter`] if the value is neither null
/// nor an object.
pub fn section<'a>(
    params: &'a Parameters,
    key: &str,
) -> Result<Option<&'a Parameters>, ClassifyError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(invalid(key, "an object", other)),
    }
}

pub(crate) fn invalid(key: &str, expected: &'static str, found: &Value) -> ClassifyError {
    ClassifyError::InvalidParameter {
        key: key.to_owned(),
        expected,
        found: found.to_string(),
    }
}
