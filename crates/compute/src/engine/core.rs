use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tally_core::{ExpressionId, ExpressionRecord, ExpressionStatus, OwnerId};
use tracing::{debug, info};

use super::Submission;
use crate::distributor::Distributor;
use crate::error::EngineError;
use crate::parser::parse;
use crate::scheduler::{EngineMetrics, Scheduler, SchedulerConfig, Task};
use crate::tree::OperationNode;

/// One live parse unit and its evaluation progress.
#[derive(Debug, Clone)]
pub struct Expression {
    pub id: ExpressionId,
    pub owner: OwnerId,
    pub text: String,
    pub root: OperationNode,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
}

impl Expression {
    pub fn record(&self) -> ExpressionRecord {
        ExpressionRecord {
            id: self.id,
            owner: self.owner,
            expression: self.text.clone(),
            status: self.status,
            result: self.result,
        }
    }
}

pub(super) struct EngineState {
    pub(super) forest: HashMap<ExpressionId, Expression>,
    pub(super) distributor: Distributor,
    pub(super) metrics: EngineMetrics,
}

/// Expression scheduling engine.
pub struct Engine {
    pub(super) scheduler: Scheduler,
    pub(super) state: Mutex<EngineState>,
}

impl Engine {
    pub fn new(config: SchedulerConfig) -> Self {
        let distributor = Distributor::new(config.lease_timeout());
        Self {
            scheduler: Scheduler::new(config),
            state: Mutex::new(EngineState {
                forest: HashMap::new(),
                distributor,
                metrics: EngineMetrics::default(),
            }),
        }
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, EngineState>, EngineError> {
        self.state
            .lock()
            .map_err(|e| EngineError::InternalFault(format!("engine state lock: {}", e)))
    }

    /// Parse `text`, register it under `id` and run the first scheduling
    /// pass. A parse failure registers nothing.
    pub fn submit(
        &self,
        id: ExpressionId,
        owner: OwnerId,
        text: &str,
    ) -> Result<Submission, EngineError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        if state.forest.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let mut root = match parse(text) {
            Ok(root) => root,
            Err(e) => {
                state.metrics.parse_errors += 1;
                debug!(expression_id = %id, "Rejected expression: {}", e);
                return Err(e.into());
            }
        };

        if let Some(value) = root.value() {
            state.metrics.record_completion();
            info!(expression_id = %id, "Expression is a literal, completed with {}", value);
            return Ok(Submission::Completed(
                ExpressionRecord::pending(id, owner, text).completed(value),
            ));
        }

        let tasks_emitted = self.scheduler.schedule(id, &mut root, &mut state.distributor);
        let expression = Expression {
            id,
            owner,
            text: text.to_string(),
            root,
            status: ExpressionStatus::Pending,
            result: None,
        };
        let record = expression.record();
        state.forest.insert(id, expression);

        info!(expression_id = %id, tasks = tasks_emitted, "Scheduled expression");
        Ok(Submission::Scheduled { record, tasks_emitted })
    }

    /// Hand out the oldest pending task, or `None` when nothing is pending.
    pub fn pull_task(&self) -> Result<Option<Task>, EngineError> {
        let mut state = self.lock()?;
        let task = state.distributor.dequeue(Instant::now());
        if let Some(task) = &task {
            state.metrics.tasks_dispatched += 1;
            debug!(expression_id = %task.expression_id, task_id = %task.id, "Dispatched task");
        }
        Ok(task)
    }

    /// Status of a live expression owned by `owner`. Finished expressions
    /// are no longer held here and report `ExpressionNotFound`.
    pub fn status(&self, id: ExpressionId, owner: OwnerId) -> Result<ExpressionRecord, EngineError> {
        let state = self.lock()?;
        state
            .forest
            .get(&id)
            .filter(|expr| expr.owner == owner)
            .map(Expression::record)
            .ok_or(EngineError::ExpressionNotFound(id))
    }

    /// Snapshot of the counters with current gauges filled in.
    pub fn metrics(&self) -> Result<EngineMetrics, EngineError> {
        let state = self.lock()?;
        let mut metrics = state.metrics.clone();
        metrics.queue_depth = state.distributor.pending_len();
        metrics.in_flight = state.distributor.in_flight_len();
        metrics.live_expressions = state.forest.len();
        Ok(metrics)
    }
}
