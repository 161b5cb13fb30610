//! Worker-facing payloads shared by the server and the agent.

use serde::{Deserialize, Serialize};

use crate::entity::{Operator, TaskId};

/// A single operation as handed to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: TaskId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operator,
    /// Advisory compute time in milliseconds.
    pub operation_time: u64,
}

/// Body of `GET /internal/task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: TaskPayload,
}

/// Body of `POST /internal/task`. Exactly one of `result` / `error` is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultSubmission {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResultSubmission {
    pub fn value(id: TaskId, result: f64) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn failure(id: TaskId, error: impl Into<String>) -> Self {
        Self { id, result: None, error: Some(error.into()) }
    }
}
