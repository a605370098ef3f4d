//! Response envelopes and error-message flattening.
//!
//! Successful calls wrap their payload as `{"data": ...}`; paginated GETs add
//! a `paginator` block. Failures carry `{"error": {"message": ...}}` where
//! `message` may be a single string, a flat array of strings, or an array
//! containing objects of per-field validation errors. [`rejection_message`]
//! reduces any of those shapes to one human-readable string for the failure
//! log.

use serde::Deserialize;
use serde_json::Value;

/// Fixed reason recorded when a request produced no response at all
/// (connect failure, timeout, connection reset).
pub const NO_RESPONSE_MESSAGE: &str = "No response received from the Northstar instance.";

/// Success envelope for single-object endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Success envelope for paginated list endpoints.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub paginator: Paginator,
}

#[derive(Debug, Deserialize)]
pub struct Paginator {
    pub current_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Value,
}

/// Flatten an error `message` value into a single comma-joined string.
///
/// Arrays are flattened one level deep: string elements pass through and
/// object elements contribute their values (validation errors keyed by field).
#[must_use]
pub fn flatten_error_message(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(part_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn part_to_string(part: &Value) -> String {
    match part {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .values()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Derive the failure reason from a raw error response body.
///
/// Prefers the flattened `error.message`; falls back to the raw body when it
/// does not parse as an error envelope, and to [`NO_RESPONSE_MESSAGE`] when
/// the body is empty.
#[must_use]
pub fn rejection_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return flatten_error_message(&envelope.error.message);
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        NO_RESPONSE_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}
