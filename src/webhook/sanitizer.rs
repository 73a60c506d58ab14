//! Payload sanitization for diagnostics
//!
//! Produces a copy of a webhook payload that is safe to put in logs and error
//! messages. Only used on the rejection path; accepted webhooks are always
//! processed from the original payload.

use serde_json::Value;

/// Keys removed from the `resource` sub-object
pub const SENSITIVE_RESOURCE_KEYS: [&str; 2] = ["email", "card_details"];

/// Copy of `payload` with the cardholder's email and card details removed
///
/// If `payload` is an object whose `resource` member is also an object,
/// `resource.email` and `resource.card_details` are dropped. Everything else,
/// including non-object payloads, is returned unchanged.
pub fn sanitize(payload: &Value) -> Value {
    let mut sanitized = payload.clone();

    if let Some(resource) = sanitized
        .get_mut("resource")
        .and_then(Value::as_object_mut)
    {
        for key in SENSITIVE_RESOURCE_KEYS {
            resource.remove(key);
        }
    }

    sanitized
}

/// Sanitized payload rendered as compact JSON
pub fn sanitized_string(payload: &Value) -> String {
    sanitize(payload).to_string()
}
