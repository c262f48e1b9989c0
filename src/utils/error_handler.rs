// Relay error type and the catch-all error envelope

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use http_body_util::LengthLimitError;
use serde_json::json;
use std::error::Error;
use thiserror::Error;
use tracing::{error, warn};

/// Every failure a relay handler can hit.
///
/// The upstream domain errors display exactly the upstream `error_message`,
/// the rest display a short description followed by the cause.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    InvalidWebhook(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream response could not be decoded: {0}")]
    Decode(String),

    #[error("Request body could not be read: {0}")]
    InboundBody(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    #[error("{0}")]
    Task(String),
}

impl RelayError {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidToken(_) => "invalid_token",
            RelayError::InvalidWebhook(_) => "invalid_webhook",
            RelayError::InvalidInput(_) => "invalid_input",
            RelayError::Transport(_) => "transport",
            RelayError::Decode(_) => "decode",
            RelayError::InboundBody(_) => "inbound_body",
            RelayError::InvalidHeader(_) => "invalid_header",
            RelayError::MissingConfig(_) => "missing_config",
            RelayError::Task(_) => "task",
        }
    }

    /// True for errors raised from a recognized upstream `error_code`
    pub fn is_upstream_rejection(&self) -> bool {
        matches!(
            self,
            RelayError::InvalidToken(_) | RelayError::InvalidWebhook(_) | RelayError::InvalidInput(_)
        )
    }
}

/// Collapses every error into `{ "error_message": ... }` with a 500.
impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let message: String = self.to_string();

        if self.is_upstream_rejection() {
            warn!(kind = self.kind(), "Upstream rejected the request: {}", message);
        } else {
            error!(kind = self.kind(), "Relay failed: {}", message);
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error_message": message })),
        )
            .into_response()
    }
}

impl From<BytesRejection> for RelayError {
    fn from(rejection: BytesRejection) -> Self {
        if find_cause::<LengthLimitError>(&rejection).is_some() {
            return RelayError::InboundBody(format!("Request body too large: {}", rejection.body_text()));
        }
        RelayError::InboundBody(rejection.body_text())
    }
}

/// Helper function to find specific error type in error chain
pub fn find_cause<T: Error + 'static>(err: &dyn Error) -> Option<&T> {
    let mut source: Option<&dyn Error> = err.source();

    while let Some(s) = source {
        if let Some(typed) = s.downcast_ref::<T>() {
            return Some(typed);
        }
        source = s.source();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn envelope(err: RelayError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status: StatusCode = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn domain_errors_render_the_upstream_message_verbatim() {
        let (status, body) = envelope(RelayError::InvalidToken("provided token is malformed".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error_message": "provided token is malformed" }));
    }

    #[tokio::test]
    async fn missing_config_names_the_variable() {
        let (status, body) = envelope(RelayError::MissingConfig("PLAID_SECRET")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error_message"], "PLAID_SECRET is not configured");
    }

    #[test]
    fn only_validator_errors_count_as_upstream_rejections() {
        assert!(RelayError::InvalidWebhook("x".into()).is_upstream_rejection());
        assert!(RelayError::InvalidInput("x".into()).is_upstream_rejection());
        assert!(!RelayError::Decode("x".into()).is_upstream_rejection());
        assert!(!RelayError::Task("x".into()).is_upstream_rejection());
    }
}
