//! Response handling shared by the outbound gateways.

use prscribe_core::{GatewayError, Upstream};
use reqwest::StatusCode;
use serde_json::Value;

/// First non-null field of a JSON object body, tried in `fields` order.
///
/// Returns `None` when the body is not JSON or has none of the fields.
pub(crate) fn first_text_field(body: &str, fields: &[&str]) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    fields.iter().find_map(|field| match json.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

/// Error for a response with status 300 or above.
///
/// The message is taken from the first of `fields` present in a JSON body,
/// then the raw body, then the status reason phrase when the body is empty.
pub(crate) fn status_error(
    upstream: Upstream,
    operation: String,
    status: StatusCode,
    body: &str,
    fields: &[&str],
) -> GatewayError {
    let message = first_text_field(body, fields).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body.to_string()
        }
    });
    GatewayError::UpstreamStatus {
        upstream,
        operation,
        status: status.as_u16(),
        message,
    }
}

/// Classify a `reqwest` failure. Anything other than a malformed request is
/// treated as a transport failure.
pub(crate) fn transport_error(
    upstream: Upstream,
    operation: String,
    err: &reqwest::Error,
) -> GatewayError {
    if err.is_builder() {
        GatewayError::Unclassified {
            upstream,
            operation,
            message: err.to_string(),
        }
    } else {
        GatewayError::Network {
            upstream,
            operation,
            message: err.to_string(),
        }
    }
}
