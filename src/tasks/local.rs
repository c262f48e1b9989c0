// In-process worker pool, used when no broker is configured

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{fetch_accounts_task, TaskOutcome, TaskQueue};
use crate::upstream::{OutboundRequest, UpstreamClient};
use crate::utils::error_handler::RelayError;

#[derive(Debug)]
struct Job {
    id: Uuid,
    request: OutboundRequest,
    reply: oneshot::Sender<TaskOutcome>,
}

/// Tokio workers sharing one unbounded job channel.
#[derive(Debug, Clone)]
pub struct LocalTaskQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl LocalTaskQueue {
    /// Spawns `workers` tasks on the current runtime.
    pub fn start(workers: usize, client: UpstreamClient) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>> = Arc::new(Mutex::new(receiver));

        for worker in 0..workers {
            let receiver = Arc::clone(&receiver);
            let client: UpstreamClient = client.clone();
            tokio::spawn(run_worker(worker, receiver, client));
        }

        info!("Started {} in-process task workers", workers);
        Self { sender }
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    client: UpstreamClient,
) {
    loop {
        // Only hold the lock while waiting for the next job
        let next: Option<Job> = receiver.lock().await.recv().await;

        let Some(job) = next else {
            debug!(worker, "Task channel closed, worker exiting");
            break;
        };

        debug!(worker, task_id = %job.id, "Running task");
        let outcome: TaskOutcome = fetch_accounts_task(&client, &job.request).await;

        if job.reply.send(outcome).is_err() {
            warn!(worker, task_id = %job.id, "Submitter stopped waiting, dropping task result");
        }
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    #[instrument(name = "local_task", skip(self, job), fields(url = %job.url))]
    async fn execute(&self, job: OutboundRequest) -> Result<Value, RelayError> {
        let (reply, outcome) = oneshot::channel::<TaskOutcome>();
        let id: Uuid = Uuid::new_v4();

        self.sender
            .send(Job { id, request: job, reply })
            .map_err(|_| RelayError::Task("Task queue is closed".to_string()))?;

        debug!(task_id = %id, "Task submitted, waiting for result");

        outcome
            .await
            .map_err(|_| RelayError::Task("Worker dropped the task without a result".to_string()))?
            .into_result()
    }
}
