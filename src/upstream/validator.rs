// Maps the upstream `error_code` field onto typed relay errors

use serde_json::Value;

use crate::utils::error_handler::RelayError;

/// Checks a decoded upstream payload for the error codes we recognize.
///
/// Unrecognized or absent codes pass through untouched, so upstream errors
/// outside this table reach the caller as a normal 200 payload.
pub fn validate_response(payload: Value) -> Result<Value, RelayError> {
    let raise: fn(String) -> RelayError = match payload.get("error_code").and_then(Value::as_str) {
        Some("INVALID_PUBLIC_TOKEN") | Some("INVALID_ACCESS_TOKEN") => RelayError::InvalidToken,
        Some("SANDBOX_WEBHOOK_INVALID") => RelayError::InvalidWebhook,
        Some("MISSING_FIELDS") => RelayError::InvalidInput,
        _ => return Ok(payload),
    };

    // Fall back to the code itself when the upstream sent no message
    let message: String = payload
        .get("error_message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error_code").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    Err(raise(message))
}
