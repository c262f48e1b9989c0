// Inbound request parsing for the relay endpoints

use std::collections::BTreeMap;

use axum::{body::Bytes, extract::rejection::BytesRejection};
use serde_json::{Map, Value};

use crate::utils::error_handler::RelayError;

/// Reads the inbound body as any JSON value; an empty body counts as `{}`.
pub fn parse_json(body: Result<Bytes, BytesRejection>) -> Result<Value, RelayError> {
    let bytes: Bytes = body?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::InboundBody(format!("invalid JSON: {e}")))
}

/// Reads the inbound body as a JSON object; an empty body counts as `{}`.
pub fn parse_inbound(body: Result<Bytes, BytesRejection>) -> Result<Value, RelayError> {
    let value: Value = parse_json(body)?;

    if !value.is_object() {
        return Err(RelayError::InboundBody("expected a JSON object".to_string()));
    }

    Ok(value)
}

/// The `{ "body": ..., "headers": {...} }` shape most endpoints accept.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    pub body: Value,
    pub headers: BTreeMap<String, String>,
}

impl RelayRequest {
    /// Missing `body` relays `null`, missing `headers` sends none.
    pub fn from_inbound(mut inbound: Value) -> Result<Self, RelayError> {
        let body: Value = inbound
            .get_mut("body")
            .map(Value::take)
            .unwrap_or(Value::Null);

        let headers: BTreeMap<String, String> = match inbound.get_mut("headers").map(Value::take) {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(name, value)| (name, header_text(value)))
                .collect(),
            Some(_) => {
                return Err(RelayError::InvalidHeader("headers must be a JSON object".to_string()));
            }
        };

        Ok(Self { body, headers })
    }
}

// Strings go through as-is, anything else as its JSON text
fn header_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_and_headers_are_split_out() {
        let request: RelayRequest = RelayRequest::from_inbound(json!({
            "body": { "client_id": "abc", "secret": "xyz", "link_token": "link-sandbox-1" },
            "headers": { "content-type": "application/json", "X-Retry": 3 }
        }))
        .unwrap();

        assert_eq!(request.body["link_token"], "link-sandbox-1");
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.headers["X-Retry"], "3");
    }

    #[test]
    fn missing_parts_become_null_and_empty() {
        let request: RelayRequest = RelayRequest::from_inbound(json!({})).unwrap();

        assert_eq!(request.body, Value::Null);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn non_object_headers_are_rejected() {
        let result = RelayRequest::from_inbound(json!({ "body": {}, "headers": ["content-type"] }));
        assert!(matches!(result, Err(RelayError::InvalidHeader(_))));
    }

    #[test]
    fn blank_body_is_an_empty_object() {
        assert_eq!(parse_inbound(Ok(Bytes::from_static(b"  \n"))).unwrap(), json!({}));
    }

    #[test]
    fn any_json_value_is_accepted_where_objects_are_not_required() {
        assert_eq!(parse_json(Ok(Bytes::from_static(b"[1, 2]"))).unwrap(), json!([1, 2]));
        assert_eq!(parse_json(Ok(Bytes::from_static(b"\"text\""))).unwrap(), json!("text"));
        assert_eq!(parse_json(Ok(Bytes::new())).unwrap(), json!({}));
        assert!(matches!(
            parse_json(Ok(Bytes::from_static(b"{\"client_id\": "))),
            Err(RelayError::InboundBody(_))
        ));
    }

    #[test]
    fn malformed_or_non_object_json_is_rejected() {
        assert!(matches!(
            parse_inbound(Ok(Bytes::from_static(b"{\"body\": "))),
            Err(RelayError::InboundBody(_))
        ));
        assert!(matches!(
            parse_inbound(Ok(Bytes::from_static(b"[1, 2]"))),
            Err(RelayError::InboundBody(msg)) if msg == "expected a JSON object"
        ));
    }
}
