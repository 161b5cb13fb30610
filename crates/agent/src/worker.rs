//! Poll loop run by each concurrent worker.

use std::time::Duration;

use tally_core::{TaskPayload, TaskResultSubmission};
use tracing::{debug, info, warn};

use crate::client::OrchestratorClient;
use crate::evaluate::evaluate;

/// Turn a pulled task into the body posted back to the orchestrator.
pub fn compute(task: &TaskPayload) -> TaskResultSubmission {
    match evaluate(task.operation, task.arg1, task.arg2) {
        Ok(value) => TaskResultSubmission::value(task.id, value),
        Err(e) => TaskResultSubmission::failure(task.id, e.to_string()),
    }
}

/// Pull, wait out the advisory operation time, compute, report. Forever.
///
/// Transport errors are logged and retried after `idle`; the loop never exits.
pub async fn run(worker: u32, client: OrchestratorClient, idle: Duration) {
    info!(worker, "Worker started");
    loop {
        let task = match client.pull().await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tokio::time::sleep(idle).await;
                continue;
            }
            Err(e) => {
                warn!(worker, "Pull failed: {:#}", e);
                tokio::time::sleep(idle).await;
                continue;
            }
        };

        debug!(worker, task_id = %task.id, op = %task.operation, "Task received");
        tokio::time::sleep(Duration::from_millis(task.operation_time)).await;

        let submission = compute(&task);
        if let Some(err) = &submission.error {
            warn!(worker, task_id = %task.id, "Task failed: {}", err);
        }
        if let Err(e) = client.submit(&submission).await {
            // The lease will expire and the task will be handed out again.
            warn!(worker, task_id = %task.id, "Submit failed: {:#}", e);
        }
    }
}
