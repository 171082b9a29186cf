use serde_json::{Map, Value};

use crate::errors::NormalizationError;

/// Pulls a JSON object out of model output that may be wrapped in code
/// fences or surrounded by prose. A top-level array yields its first object.
pub fn parse_json_object(response: &str) -> Option<Map<String, Value>> {
    let trimmed = response.trim();
    if let Some(obj) = as_object(trimmed) {
        return Some(obj);
    }

    let cleaned = strip_code_fences(trimmed);
    if let Some(obj) = as_object(cleaned) {
        return Some(obj);
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    as_object(&cleaned[start..=end])
}

fn as_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(obj) => Some(obj),
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(obj)) => Some(obj),
            None => Some(Map::new()),
            Some(_) => None,
        },
        _ => None,
    }
}

fn strip_code_fences(text: &str) -> &str {
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Reads an integer-valued key. Whole-number floats are accepted.
pub fn integer_key(obj: &Map<String, Value>, key: &'static str) -> Result<i64, NormalizationError> {
    let value = obj.get(key).ok_or(NormalizationError::MissingKey(key))?;
    as_integer(value).ok_or_else(|| {
        NormalizationError::Malformed(format!("`{key}` is not an integer: {value}"))
    })
}

pub fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Reads every documented key. Only when one is missing does a
/// model-reported `"error"` take precedence over `MissingKey`.
pub fn documented_integers<const N: usize>(
    obj: &Map<String, Value>,
    keys: [&'static str; N],
) -> Result<[i64; N], NormalizationError> {
    let mut values = [0i64; N];
    for (slot, key) in values.iter_mut().zip(keys) {
        *slot = match integer_key(obj, key) {
            Err(NormalizationError::MissingKey(missing)) => {
                return Err(reported_error(obj)
                    .map(NormalizationError::Unrecognized)
                    .unwrap_or(NormalizationError::MissingKey(missing)));
            }
            other => other?,
        };
    }
    Ok(values)
}

/// A model-reported refusal, e.g. `{"error": "no single date"}`.
fn reported_error(obj: &Map<String, Value>) -> Option<String> {
    obj.get("error").and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}
