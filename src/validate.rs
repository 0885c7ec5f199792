//! Payload validation and sanitisation.
//!
//! Each domain service supplies a [`PayloadValidator`] that the executor
//! runs once per network response, before the value is cached. Validators
//! work on `serde_json::Value` so they can repair payloads that would not
//! deserialise as-is: drop records without identifying fields, coerce and
//! clamp numbers, fill documented defaults and clean up URLs.
//!
//! Only a categorically absent payload (`null`) is an error.

use reqwest::Url;
use serde_json::{Map, Value};
use tracing::warn;

use crate::endpoint::EndpointType;
use crate::{FolioError, Result};

/// Per-domain structural validation hook.
pub trait PayloadValidator: Send + Sync {
    /// Validate and normalise a raw payload for `endpoint`.
    ///
    /// Returns [`FolioError::EmptyPayload`] for a `null` payload and
    /// never fails for missing optional fields.
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value>;
}

/// Passes payloads through unchanged apart from the `null` check.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PayloadValidator for PassThrough {
    fn validate_and_transform(&self, data: Value, endpoint: EndpointType) -> Result<Value> {
        require_payload(data, endpoint)
    }
}

/// Reject a `null` payload.
pub fn require_payload(data: Value, endpoint: EndpointType) -> Result<Value> {
    if data.is_null() {
        return Err(FolioError::EmptyPayload(endpoint));
    }
    Ok(data)
}

/// Keep the array elements that are objects carrying every `required`
/// field, then normalise each survivor with `fix`.
///
/// Numeric identifying fields are converted to strings. A non-array
/// payload is logged and replaced by an empty array.
pub fn filter_records<F>(
    data: Value,
    endpoint: EndpointType,
    required: &[&str],
    mut fix: F,
) -> Result<Value>
where
    F: FnMut(&mut Map<String, Value>),
{
    let data = require_payload(data, endpoint)?;
    let Value::Array(items) = data else {
        warn!(%endpoint, "expected an array payload, substituting an empty list");
        return Ok(Value::Array(Vec::new()));
    };

    let total = items.len();
    let kept: Vec<Value> = items
        .into_iter()
        .filter_map(|item| {
            let Value::Object(mut record) = item else {
                return None;
            };
            for field in required {
                if !normalise_identifier(&mut record, field) {
                    return None;
                }
            }
            fix(&mut record);
            Some(Value::Object(record))
        })
        .collect();

    if kept.len() < total {
        warn!(
            %endpoint,
            dropped = total - kept.len(),
            kept = kept.len(),
            "dropped malformed records"
        );
    }
    Ok(Value::Array(kept))
}

/// Normalise a single-object payload with `fix`.
///
/// A non-object payload is replaced by an empty object, so every field
/// falls back to its default.
pub fn fix_object<F>(data: Value, endpoint: EndpointType, fix: F) -> Result<Value>
where
    F: FnOnce(&mut Map<String, Value>),
{
    let data = require_payload(data, endpoint)?;
    let mut record = match data {
        Value::Object(record) => record,
        _ => {
            warn!(%endpoint, "expected an object payload, using defaults");
            Map::new()
        }
    };
    fix(&mut record);
    Ok(Value::Object(record))
}

/// Ensure `field` is a non-empty string; numbers are stringified.
fn normalise_identifier(record: &mut Map<String, Value>, field: &str) -> bool {
    match record.get(field) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(n)) => {
            let id = n.to_string();
            record.insert(field.to_string(), Value::String(id));
            true
        }
        _ => false,
    }
}

/// Read a number, accepting numeric strings.
fn as_f64(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Clamp a numeric field into `[min, max]`, writing `default` when it is
/// missing or not a number.
pub fn clamp_number(
    record: &mut Map<String, Value>,
    field: &str,
    min: f64,
    max: f64,
    default: f64,
) {
    let value = as_f64(record.get(field)).map_or(default, |n| n.clamp(min, max));
    record.insert(field.to_string(), number(value));
}

/// Coerce a field to a count in `0..=u32::MAX`, writing `0` when invalid.
pub fn non_negative_int(record: &mut Map<String, Value>, field: &str) {
    let value = as_f64(record.get(field)).map_or(0, |n| n.clamp(0.0, u32::MAX as f64).round() as u32);
    record.insert(field.to_string(), Value::from(value));
}

/// Clamp a percentage field into [0, 100], rounded to an integer.
pub fn clamp_percent(record: &mut Map<String, Value>, field: &str, default: u8) {
    let value = as_f64(record.get(field)).map_or(default as f64, |n| n.clamp(0.0, 100.0));
    record.insert(field.to_string(), Value::from(value.round() as u64));
}

/// Write `default` when `field` is missing, null or not a string.
pub fn default_string(record: &mut Map<String, Value>, field: &str, default: &str) {
    let ok = matches!(record.get(field), Some(Value::String(s)) if !s.trim().is_empty());
    if !ok {
        record.insert(field.to_string(), Value::String(default.to_string()));
    }
}

/// Remove `field` unless it is a non-empty string.
pub fn optional_string(record: &mut Map<String, Value>, field: &str) {
    let ok = matches!(record.get(field), Some(Value::String(s)) if !s.trim().is_empty());
    if !ok {
        record.remove(field);
    }
}

/// Write `default` when `field` is not a boolean.
pub fn default_bool(record: &mut Map<String, Value>, field: &str, default: bool) {
    if !matches!(record.get(field), Some(Value::Bool(_))) {
        record.insert(field.to_string(), Value::Bool(default));
    }
}

/// Keep only the non-empty strings of an array field (missing = empty).
pub fn string_list(record: &mut Map<String, Value>, field: &str) {
    let items = match record.remove(field) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(|v| matches!(v, Value::String(s) if !s.trim().is_empty()))
            .collect(),
        _ => Vec::new(),
    };
    record.insert(field.to_string(), Value::Array(items));
}

/// Sanitise a URL.
///
/// Absolute URLs must be http(s). Relative paths are resolved against
/// `base`: `/x` against its origin, `x` below its path. Anything else is
/// rejected.
///
/// ```rust
/// # use folio::validate::sanitize_url;
/// # use reqwest::Url;
/// let base = Url::parse("https://example.com/api/").unwrap();
/// assert_eq!(
///     sanitize_url("/img/me.png", &base).as_deref(),
///     Some("https://example.com/img/me.png")
/// );
/// assert_eq!(sanitize_url("javascript:alert(1)", &base), None);
/// ```
pub fn sanitize_url(raw: &str, base: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).or_else(|_| base.join(raw)).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Sanitise an optional URL field in place; invalid values are removed.
pub fn url_field(record: &mut Map<String, Value>, field: &str, base: &Url) {
    let cleaned = match record.get(field) {
        Some(Value::String(raw)) => sanitize_url(raw, base),
        _ => None,
    };
    match cleaned {
        Some(url) => {
            record.insert(field.to_string(), Value::String(url));
        }
        None => {
            record.remove(field);
        }
    }
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
}
