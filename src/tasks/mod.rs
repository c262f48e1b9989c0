// Background execution of upstream calls
// Handlers submit a job and wait for its outcome; the queue decides where it runs

pub mod local;
pub mod redis_queue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::upstream::{OutboundRequest, UpstreamClient};
use crate::utils::error_handler::RelayError;

pub use local::LocalTaskQueue;
pub use redis_queue::RedisTaskQueue;

/// Submit-and-wait seam for the deferred fetch.
#[async_trait]
pub trait TaskQueue: Send + Sync + std::fmt::Debug {
    /// Hands the request to a worker and waits, without a timeout, for its outcome.
    async fn execute(&self, job: OutboundRequest) -> Result<Value, RelayError>;
}

/// What a worker reports back for a job.
///
/// Errors travel as their display text so the submitter surfaces the same
/// message a direct call would have produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success(Value),
    Failure(String),
}

impl TaskOutcome {
    pub fn into_result(self) -> Result<Value, RelayError> {
        match self {
            TaskOutcome::Success(value) => Ok(value),
            TaskOutcome::Failure(message) => Err(RelayError::Task(message)),
        }
    }
}

/// The work every worker performs for a job: one upstream POST.
pub async fn fetch_accounts_task(client: &UpstreamClient, job: &OutboundRequest) -> TaskOutcome {
    match client.post(job).await {
        Ok(value) => TaskOutcome::Success(value),
        Err(err) => TaskOutcome::Failure(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_outcome_keeps_the_worker_message() {
        let err: RelayError = TaskOutcome::Failure("Upstream request failed: connection refused".into())
            .into_result()
            .unwrap_err();

        assert_eq!(err.to_string(), "Upstream request failed: connection refused");
    }

    #[test]
    fn outcome_wire_format_is_tagged() {
        let encoded: Value = serde_json::to_value(TaskOutcome::Success(json!({ "accounts": [] }))).unwrap();
        assert_eq!(encoded, json!({ "status": "success", "result": { "accounts": [] } }));
    }
}
