use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{fetch_accounts_task, TaskOutcome, TaskQueue};
use crate::upstream::{OutboundRequest, UpstreamClient};
use crate::utils::error_handler::RelayError;

const TASK_QUEUE_KEY: &str = "plaid_relay:tasks";
const RESULT_KEY_PREFIX: &str = "plaid_relay:result:";
// Unclaimed results expire after 24 hours
const RESULT_TTL_SECONDS: u64 = 86_400;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize, Deserialize)]
struct TaskEnvelope {
    id: Uuid,
    request: OutboundRequest,
}

fn result_key(id: &Uuid) -> String {
    format!("{RESULT_KEY_PREFIX}{id}")
}

fn broker_error(err: impl std::fmt::Display) -> RelayError {
    RelayError::Task(format!("Task broker error: {err}"))
}

/// Redis-backed queue: a list as broker, one list per task as result backend.
#[derive(Debug, Clone)]
pub struct RedisTaskQueue {
    client: Client,
}

impl RedisTaskQueue {
    /// Verifies the broker is reachable and starts `workers` consumers on the current runtime.
    pub async fn connect(url: &str, workers: usize, upstream: UpstreamClient) -> Result<Self> {
        let client: Client = Client::open(url).context("Failed to create Redis client")?;

        let mut conn: MultiplexedConnection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        // Simple ping to verify connection
        let _: () = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Failed to ping Redis")?;

        let host: String = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());

        for worker in 0..workers {
            let name: String = format!("worker-{worker}@{host}");
            tokio::spawn(run_consumer(name, client.clone(), upstream.clone()));
        }

        info!("Redis task broker connected, {} consumers started", workers);
        Ok(Self { client })
    }
}

async fn run_consumer(name: String, client: Client, upstream: UpstreamClient) {
    loop {
        if let Err(e) = consume(&name, &client, &upstream).await {
            error!(worker = %name, "Task consumer failed: {:#}", e);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

async fn consume(name: &str, client: &Client, upstream: &UpstreamClient) -> Result<()> {
    let mut conn: MultiplexedConnection = client
        .get_multiplexed_async_connection()
        .await
        .context("Failed to get Redis multiplexed connection")?;

    debug!(worker = %name, "Waiting for tasks");

    loop {
        // Timeout 0 blocks until a task arrives
        let (_, raw): (String, String) = redis::cmd("BRPOP")
            .arg(TASK_QUEUE_KEY)
            .arg(0)
            .query_async(&mut conn)
            .await
            .context("Failed to pop task from Redis")?;

        let envelope: TaskEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(worker = %name, "Skipping malformed task: {}", e);
                continue;
            }
        };

        debug!(worker = %name, task_id = %envelope.id, "Running task");
        let outcome: TaskOutcome = fetch_accounts_task(upstream, &envelope.request).await;
        let encoded: String = serde_json::to_string(&outcome).context("Failed to encode task outcome")?;
        let key: String = result_key(&envelope.id);

        let stored: redis::RedisResult<()> = redis::pipe()
            .cmd("RPUSH").arg(&key).arg(encoded).ignore()
            .cmd("EXPIRE").arg(&key).arg(RESULT_TTL_SECONDS).ignore()
            .query_async(&mut conn)
            .await;

        if let Err(e) = stored {
            // The submitter blocks on this key without a timeout
            error!(worker = %name, task_id = %envelope.id, "Dropped task outcome, submitter will not be answered: {}", e);
            return Err(e).context("Failed to store task outcome in Redis");
        }
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    #[instrument(name = "redis_task", skip(self, job), fields(url = %job.url))]
    async fn execute(&self, job: OutboundRequest) -> Result<Value, RelayError> {
        let envelope: TaskEnvelope = TaskEnvelope { id: Uuid::new_v4(), request: job };
        let key: String = result_key(&envelope.id);
        let encoded: String = serde_json::to_string(&envelope).map_err(broker_error)?;

        // Dedicated connection: the blocking pop below would stall a shared one
        let mut conn: MultiplexedConnection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(broker_error)?;

        let _: () = redis::cmd("LPUSH")
            .arg(TASK_QUEUE_KEY)
            .arg(encoded)
            .query_async(&mut conn)
            .await
            .map_err(broker_error)?;

        debug!(task_id = %envelope.id, "Task submitted, waiting for result");

        let (_, raw): (String, String) = redis::cmd("BLPOP")
            .arg(&key)
            .arg(0)
            .query_async(&mut conn)
            .await
            .map_err(broker_error)?;

        let outcome: TaskOutcome = serde_json::from_str(&raw).map_err(broker_error)?;
        outcome.into_result()
    }
}
