//! Delayed callback scheduling
//!
//! A scheduled callback hits the expiry endpoint once after a delay. Every
//! schedule returns a [`ScheduleToken`] that can later cancel it. Cancelling is
//! best-effort: the sweep re-checks each timer's deadline and status before
//! alerting, so a stale callback that still fires does no harm.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};

/// Opaque handle to a scheduled callback
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleToken(pub String);

impl fmt::Display for ScheduleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Invokes a callback URL once a delay has elapsed
#[async_trait]
pub trait DelayScheduler: Send + Sync {
    async fn schedule(&self, destination: &str, delay: Duration) -> Result<ScheduleToken>;

    async fn cancel(&self, token: &ScheduleToken) -> Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    message_id: String,
}

/// Upstash QStash delayed publish
#[derive(Debug, Clone)]
pub struct QStashScheduler {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl QStashScheduler {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn publish_url(&self, destination: &str) -> String {
        format!("{}/v2/publish/{}", self.base_url, destination)
    }
}

/// QStash takes the delay as a header such as `900s`
fn delay_header(delay: Duration) -> String {
    format!("{}s", delay.as_secs())
}

#[async_trait]
impl DelayScheduler for QStashScheduler {
    async fn schedule(&self, destination: &str, delay: Duration) -> Result<ScheduleToken> {
        let response = self.client
            .post(self.publish_url(destination))
            .bearer_auth(&self.token)
            .header("Upstash-Delay", delay_header(delay))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BotError::Scheduler(format!(
                "QStash publish failed {}: {}", status, error_text
            )));
        }

        let published: PublishResponse = response.json().await?;
        debug!("QStash callback {} scheduled in {:?}", published.message_id, delay);
        Ok(ScheduleToken(published.message_id))
    }

    async fn cancel(&self, token: &ScheduleToken) -> Result<()> {
        let response = self.client
            .delete(format!("{}/v2/messages/{}", self.base_url, token))
            .bearer_auth(&self.token)
            .send()
            .await?;

        // already delivered or never existed
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("QStash callback {} was already gone", token);
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(BotError::Scheduler(format!(
                "QStash cancel of {} failed: {}", token, response.status()
            )));
        }

        debug!("QStash callback {} cancelled", token);
        Ok(())
    }
}

type TaskTable = Arc<Mutex<HashMap<ScheduleToken, JoinHandle<()>>>>;

/// In-process scheduler: a tokio task sleeps, then POSTs to the destination.
///
/// Pending callbacks die with the process.
#[derive(Debug, Clone, Default)]
pub struct LocalScheduler {
    client: reqwest::Client,
    tasks: TaskTable,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks that have not fired or been cancelled yet
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DelayScheduler for LocalScheduler {
    async fn schedule(&self, destination: &str, delay: Duration) -> Result<ScheduleToken> {
        let token = ScheduleToken(uuid::Uuid::new_v4().to_string());

        // hold the table lock across spawn so the task cannot remove itself before insertion
        let mut tasks = self.tasks.lock()
            .map_err(|e| BotError::Scheduler(format!("Failed to lock task table: {}", e)))?;

        let client = self.client.clone();
        let table = Arc::clone(&self.tasks);
        let destination = destination.to_string();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("Local callback {} firing: POST {}", task_token, destination);

            match client.post(&destination).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => warn!("Local callback {} got status {}", task_token, response.status()),
                Err(e) => warn!("Local callback {} failed: {}", task_token, e),
            }

            if let Ok(mut tasks) = table.lock() {
                tasks.remove(&task_token);
            }
        });

        tasks.insert(token.clone(), handle);
        debug!("Local callback {} scheduled in {:?}", token, delay);
        Ok(token)
    }

    async fn cancel(&self, token: &ScheduleToken) -> Result<()> {
        let handle = self.tasks.lock()
            .map_err(|e| BotError::Scheduler(format!("Failed to lock task table: {}", e)))?
            .remove(token);

        if let Some(handle) = handle {
            handle.abort();
            debug!("Local callback {} cancelled", token);
        }
        Ok(())
    }
}
