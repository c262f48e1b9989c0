// Upstream (Plaid) access: the HTTP client, the response validator and the fixed endpoint paths

pub mod client;
pub mod validator;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::UpstreamClient;
pub use validator::validate_response;

/// The upstream endpoints this service relays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamPath {
    LinkTokenCreate,
    LinkTokenGet,
    SandboxPublicTokenCreate,
    ItemPublicTokenExchange,
    TransactionsGet,
    SandboxFireWebhook,
    ItemWebhookUpdate,
}

impl UpstreamPath {
    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamPath::LinkTokenCreate => "link/token/create",
            UpstreamPath::LinkTokenGet => "link/token/get",
            UpstreamPath::SandboxPublicTokenCreate => "sandbox/public_token/create",
            UpstreamPath::ItemPublicTokenExchange => "item/public_token/exchange",
            UpstreamPath::TransactionsGet => "transactions/get",
            UpstreamPath::SandboxFireWebhook => "sandbox/item/fire_webhook",
            UpstreamPath::ItemWebhookUpdate => "item/webhook/update",
        }
    }
}

/// One outbound call: full URL, JSON body and header set.
///
/// Serializable so it can travel through the task broker unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub url: String,
    pub body: Value,
    pub headers: BTreeMap<String, String>,
}
