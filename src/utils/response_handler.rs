// Success responses and the response-logging middleware
// HandlerResponse renders its payload as-is; the relay never wraps upstream JSON in its own envelope

use axum::{
    body::Body,
    http::{Method, Request, Response, StatusCode, Uri},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::Value;
use std::{convert::Infallible, time::Instant};
use tracing::{debug, error, info};

use crate::utils::utils::to_two_space_indented_json;

/// Convenience struct for building responses in handlers
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status_code: StatusCode,
    pub data: Option<Value>,
}

impl HandlerResponse {
    /// Creates a new response with specified status code and no body
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            data: None,
        }
    }

    /// 200 with the given JSON payload
    pub fn ok(data: Value) -> Self {
        Self::new(StatusCode::OK).data(data)
    }

    /// Adds JSON data payload to the response
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response: Response<Body> = match &self.data {
            Some(data) => Json(data.clone()).into_response(),
            None => Response::new(Body::empty()),
        };

        *response.status_mut() = self.status_code;

        // Keep the payload around so the logging middleware can print it
        response.extensions_mut().insert(self);
        response
    }
}

/// Logs the handler payload with proper JSON indentation
fn log_payload(payload: &Value) {
    match to_two_space_indented_json(payload) {
        Ok(spaced_json) => debug!("\nFinal response:\n{}", spaced_json),
        Err(err) => error!("Failed to format response JSON: {:?}", err),
    }
}

/// Middleware that logs every response with its status, latency and timestamp
pub async fn response_logger(
    req: Request<Body>,
    next: Next,
) -> Result<Response<Body>, Infallible> {
    let method: Method = req.method().clone();
    let uri: Uri = req.uri().clone();
    let started: Instant = Instant::now();

    let response: Response<Body> = next.run(req).await;

    let elapsed_ms: u64 = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let status: StatusCode = response.status();

    info!(
        %method,
        path = %uri.path(),
        status = status.as_u16(),
        elapsed_ms,
        date = %Utc::now().to_rfc3339(),
        "Request completed"
    );

    if let Some(HandlerResponse { data: Some(payload), .. }) = response.extensions().get::<HandlerResponse>() {
        log_payload(payload);
    }

    Ok(response)
}
