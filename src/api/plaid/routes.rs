// Plaid relay route definitions

use axum::{routing::post, Router};

use crate::config::state::AppState;
use super::handler;

/// Creates router with every relay endpoint; all of them are POST only
pub fn plaid_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(handler::sign_in))
        .route("/signup", post(handler::sign_up))
        .route("/get-public-token", post(handler::initialize_link))
        .route("/exchange-token", post(handler::exchange_token))
        .route("/transactions", post(handler::fetch_accounts))
        .route("/fire-webhooks", post(handler::fire_webhook))
        .route("/webhook", post(handler::webhook))
        .route("/update-webhook-url", post(handler::update_webhook_url))
}
