// Outbound HTTP client for the upstream API

use std::collections::BTreeMap;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::upstream::OutboundRequest;
use crate::utils::error_handler::RelayError;

/// Thin wrapper over a pooled `reqwest::Client`.
///
/// No timeout and no retry: a stalled upstream keeps the caller waiting, and
/// the HTTP status is never inspected, only the decoded JSON.
#[derive(Debug, Clone, Default)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Sends one POST with the body serialized as JSON text and exactly the given headers.
    #[instrument(name = "upstream_post", skip(self, request), fields(url = %request.url))]
    pub async fn post(&self, request: &OutboundRequest) -> Result<Value, RelayError> {
        let headers: HeaderMap = header_map(&request.headers)?;
        let payload: Vec<u8> = serde_json::to_vec(&request.body)
            .map_err(|e| RelayError::InboundBody(e.to_string()))?;

        let response: reqwest::Response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(payload)
            .send()
            .await?;

        debug!(status = response.status().as_u16(), "Upstream responded");

        let bytes = response.bytes().await?;
        let decoded: Value = serde_json::from_slice(&bytes)
            .map_err(|e| RelayError::Decode(e.to_string()))?;

        if !decoded.is_object() {
            return Err(RelayError::Decode("expected a JSON object".to_string()));
        }

        Ok(decoded)
    }
}

/// Converts relay headers into a `HeaderMap`, rejecting names or values HTTP cannot carry.
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, RelayError> {
    let mut map: HeaderMap = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let header_name: HeaderName = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::InvalidHeader(format!("'{name}' is not a valid header name")))?;
        let header_value: HeaderValue = HeaderValue::from_str(value)
            .map_err(|_| RelayError::InvalidHeader(format!("value of '{name}' is not a valid header value")))?;
        map.insert(header_name, header_value);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaid_credential_headers_convert() {
        let headers: BTreeMap<String, String> = BTreeMap::from([
            ("content-type".to_string(), "application/json".to_string()),
            ("PLAID-CLIENT-ID".to_string(), "client-123".to_string()),
        ]);

        let map: HeaderMap = header_map(&headers).unwrap();
        assert_eq!(map.get("plaid-client-id").unwrap(), "client-123");
        assert_eq!(map.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn invalid_names_and_values_are_rejected() {
        let bad_name = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(matches!(header_map(&bad_name), Err(RelayError::InvalidHeader(_))));

        let bad_value = BTreeMap::from([("x-note".to_string(), "line\nbreak".to_string())]);
        assert!(matches!(header_map(&bad_value), Err(RelayError::InvalidHeader(_))));
    }
}
