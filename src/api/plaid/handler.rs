// Plaid relay handlers
// Every relay endpoint funnels into `relay`; errors render through RelayError's IntoResponse

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::request::{parse_inbound, parse_json, RelayRequest};
use crate::config::{environment::EnvironmentVariables, state::AppState};
use crate::upstream::{validate_response, OutboundRequest, UpstreamPath};
use crate::utils::{error_handler::RelayError, response_handler::HandlerResponse};

/// Where the upstream call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Direct,
    Deferred,
}

/// Sends one request to `path`, directly or through the task queue, and validates the answer.
async fn relay(
    state: &AppState,
    path: UpstreamPath,
    body: Value,
    headers: BTreeMap<String, String>,
    dispatch: Dispatch,
) -> Result<Value, RelayError> {
    let request: OutboundRequest = OutboundRequest {
        url: state.environment.upstream_url(path.as_str()),
        body,
        headers,
    };

    info!(path = path.as_str(), ?dispatch, "Relaying request upstream");

    let payload: Value = match dispatch {
        Dispatch::Direct => state.upstream.post(&request).await?,
        Dispatch::Deferred => state.tasks.execute(request).await?,
    };

    validate_response(payload)
}

/// `{ response_from_Plaid, note_from_developer }`
fn with_note(payload: Value, note: String) -> HandlerResponse {
    HandlerResponse::ok(json!({
        "response_from_Plaid": payload,
        "note_from_developer": note,
    }))
}

fn link_token_note(env: &EnvironmentVariables) -> String {
    format!(
        "With this link_token, you can obtain a public_token at the URL: {}.",
        env.site_url("/get-public-token")
    )
}

const ACCESS_TOKEN_HINT: &str = "The access-token is a crucial element, as it would let you connect to Items (financial institutions) and carry activities such as viewing transactions.";

fn public_token_note(env: &EnvironmentVariables) -> String {
    format!(
        "You can exchange the public_token for an access_token at the URL: {}. {}",
        env.site_url("/exchange-token"),
        ACCESS_TOKEN_HINT
    )
}

fn access_token_note(env: &EnvironmentVariables) -> String {
    format!(
        "With this public_token, you can obtain an access_token at the URL: {}. {}",
        env.site_url("/exchange-token"),
        ACCESS_TOKEN_HINT
    )
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, RelayError> {
    value.clone().ok_or(RelayError::MissingConfig(name))
}

fn json_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("content-type".to_string(), "application/json".to_string())])
}

/// JSON content type plus the configured Plaid client credentials
fn credential_headers(env: &EnvironmentVariables) -> Result<BTreeMap<String, String>, RelayError> {
    let mut headers: BTreeMap<String, String> = json_headers();
    headers.insert("PLAID-CLIENT-ID".to_string(), required(&env.plaid_client_id, "PLAID_CLIENT_ID")?);
    headers.insert("PLAID-SECRET".to_string(), required(&env.plaid_secret, "PLAID_SECRET")?);
    Ok(headers)
}

/// POST /signup → link/token/create, relaying the whole inbound JSON whatever its shape
#[instrument(name = "sign_up", skip(state, body))]
pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let inbound: Value = parse_json(body)?;

    let payload: Value = relay(&state, UpstreamPath::LinkTokenCreate, inbound, json_headers(), Dispatch::Direct).await?;

    Ok(with_note(payload, link_token_note(&state.environment)))
}

/// POST /signin → link/token/get
#[instrument(name = "sign_in", skip(state, body))]
pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let request: RelayRequest = RelayRequest::from_inbound(parse_inbound(body)?)?;

    let payload: Value = relay(&state, UpstreamPath::LinkTokenGet, request.body, request.headers, Dispatch::Direct).await?;

    Ok(with_note(payload, link_token_note(&state.environment)))
}

/// POST /get-public-token → sandbox/public_token/create
#[instrument(name = "initialize_link", skip(state, body))]
pub async fn initialize_link(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let request: RelayRequest = RelayRequest::from_inbound(parse_inbound(body)?)?;

    let payload: Value = relay(
        &state,
        UpstreamPath::SandboxPublicTokenCreate,
        request.body,
        request.headers,
        Dispatch::Direct,
    )
    .await?;

    Ok(with_note(payload, public_token_note(&state.environment)))
}

/// POST /exchange-token → item/public_token/exchange
#[instrument(name = "exchange_token", skip(state, body))]
pub async fn exchange_token(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let request: RelayRequest = RelayRequest::from_inbound(parse_inbound(body)?)?;

    let payload: Value = relay(
        &state,
        UpstreamPath::ItemPublicTokenExchange,
        request.body,
        request.headers,
        Dispatch::Direct,
    )
    .await?;

    Ok(with_note(payload, access_token_note(&state.environment)))
}

/// POST /transactions → transactions/get, run on a task worker while this request waits
#[instrument(name = "fetch_accounts", skip(state, body))]
pub async fn fetch_accounts(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let request: RelayRequest = RelayRequest::from_inbound(parse_inbound(body)?)?;

    let payload: Value = relay(&state, UpstreamPath::TransactionsGet, request.body, request.headers, Dispatch::Deferred).await?;

    Ok(HandlerResponse::ok(payload))
}

/// POST /fire-webhooks → sandbox/item/fire_webhook with the configured credentials
#[instrument(name = "fire_webhook", skip(state, body))]
pub async fn fire_webhook(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let inbound: Value = parse_inbound(body)?;
    let env: &EnvironmentVariables = &state.environment;

    let access_token: String = match inbound.get("access_token").and_then(Value::as_str) {
        Some(token) => token.to_string(),
        None => required(&env.plaid_access_token, "PLAID_ACCESS_TOKEN")?,
    };

    let outbound: Value = json!({
        "access_token": access_token,
        "webhook_code": inbound.get("webhook_code").cloned().unwrap_or(Value::Null),
    });

    let payload: Value = relay(&state, UpstreamPath::SandboxFireWebhook, outbound, credential_headers(env)?, Dispatch::Direct).await?;

    Ok(HandlerResponse::ok(payload))
}

/// POST /webhook: logs whatever arrived and acknowledges it
#[instrument(name = "webhook", skip(body))]
pub async fn webhook(body: Result<Bytes, BytesRejection>) -> HandlerResponse {
    match body {
        Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
            Ok(payload) => info!("Webhook received: {}", payload),
            Err(_) => info!("Webhook received (non-JSON): {}", String::from_utf8_lossy(&bytes)),
        },
        Err(rejection) => warn!("Webhook body could not be read: {}", rejection.body_text()),
    }

    info!("Webhook pinged!");
    HandlerResponse::new(StatusCode::OK)
}

/// POST /update-webhook-url → item/webhook/update
///
/// The caller's body and headers win; without a body, the configured access
/// token and our own `/webhook` URL are sent with the credential headers.
#[instrument(name = "update_webhook_url", skip(state, body))]
pub async fn update_webhook_url(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<HandlerResponse, RelayError> {
    let request: RelayRequest = RelayRequest::from_inbound(parse_inbound(body)?)?;
    let env: &EnvironmentVariables = &state.environment;

    let (outbound, headers) = if request.body.is_null() {
        let fallback: Value = json!({
            "access_token": required(&env.plaid_access_token, "PLAID_ACCESS_TOKEN")?,
            "webhook": env.site_url("/webhook"),
        });
        let headers: BTreeMap<String, String> = if request.headers.is_empty() {
            credential_headers(env)?
        } else {
            request.headers
        };
        (fallback, headers)
    } else {
        (request.body, request.headers)
    };

    let payload: Value = relay(&state, UpstreamPath::ItemWebhookUpdate, outbound, headers, Dispatch::Direct).await?;

    Ok(HandlerResponse::ok(payload))
}
