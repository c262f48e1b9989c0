// Application state shared by every handler

use std::sync::Arc;
use crate::config::environment::EnvironmentVariables;
use crate::tasks::{LocalTaskQueue, RedisTaskQueue, TaskQueue};
use crate::upstream::UpstreamClient;

#[derive(Debug, Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub upstream: UpstreamClient,
    pub tasks: Arc<dyn TaskQueue>,
}

impl AppState {
    /// Builds the state once at startup; picks the Redis broker when REDIS_ENDPOINT is set
    pub async fn new(environment: EnvironmentVariables) -> anyhow::Result<Self> {
        let upstream: UpstreamClient = UpstreamClient::new();
        let workers: usize = environment.task_workers;

        let tasks: Arc<dyn TaskQueue> = match environment.redis_endpoint.as_deref() {
            Some(url) => Arc::new(RedisTaskQueue::connect(url, workers, upstream.clone()).await?),
            None => Arc::new(LocalTaskQueue::start(workers, upstream.clone())),
        };

        tracing::info!("Application state initialized");

        Ok(Self {
            environment: Arc::new(environment),
            upstream,
            tasks,
        })
    }
}
