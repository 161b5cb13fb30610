//! HTTP client for the orchestrator's internal task endpoints.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tally_core::{TaskEnvelope, TaskPayload, TaskResultSubmission};

/// Client for `GET/POST /internal/task`.
#[derive(Clone)]
pub struct OrchestratorClient {
    base_url: String,
    http: reqwest::Client,
}

impl OrchestratorClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base_url, http })
    }

    fn task_url(&self) -> String {
        format!("{}/internal/task", self.base_url)
    }

    /// Fetch the next task. `None` when the queue is empty.
    pub async fn pull(&self) -> Result<Option<TaskPayload>> {
        let resp = self
            .http
            .get(self.task_url())
            .send()
            .await
            .context("failed to pull task")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("orchestrator returned {}: {}", status, body);
        }

        let envelope: TaskEnvelope = resp.json().await.context("failed to parse task")?;
        Ok(Some(envelope.task))
    }

    /// Report a result or failure for a previously pulled task.
    pub async fn submit(&self, submission: &TaskResultSubmission) -> Result<()> {
        let resp = self
            .http
            .post(self.task_url())
            .json(submission)
            .send()
            .await
            .context("failed to submit result")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("orchestrator returned {}: {}", status, body);
        }
        Ok(())
    }
}
