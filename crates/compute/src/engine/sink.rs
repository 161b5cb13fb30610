use std::time::Instant;

use tally_core::{ExpressionRecord, ExpressionStatus, TaskId};
use tracing::{debug, info, warn};

use super::core::EngineState;
use super::{Engine, ResultOutcome};
use crate::error::EngineError;

impl Engine {
    /// Completion Sink: collapse the task's node to `value`, reschedule its
    /// expression and report whether the root is now resolved.
    ///
    /// A non-finite `value` fails the expression instead.
    pub fn submit_result(&self, task_id: TaskId, value: f64) -> Result<ResultOutcome, EngineError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        if !value.is_finite() {
            let record = fail_locked(state, task_id, &format!("non-finite result {}", value))?;
            return Ok(ResultOutcome::Failed(record));
        }

        let expression_id = match state.distributor.lookup(task_id) {
            Ok(entry) => entry.task.expression_id,
            Err(e) => {
                if matches!(e, EngineError::DuplicateResult(_)) {
                    state.metrics.duplicates_rejected += 1;
                    warn!(task_id = %task_id, "Rejected duplicate result");
                }
                return Err(e);
            }
        };
        let expression = state
            .forest
            .get_mut(&expression_id)
            .ok_or(EngineError::ExpressionNotFound(expression_id))?;

        let entry = state.distributor.consume(task_id)?;
        let node = expression.root.at_path_mut(&entry.path).ok_or_else(|| {
            EngineError::InternalFault(format!("task {} points outside its tree", task_id))
        })?;
        node.collapse(value)
            .map_err(|e| EngineError::InternalFault(format!("task {}: {}", task_id, e)))?;

        state.metrics.results_applied += 1;
        if let Some(dispatched_at) = entry.dispatched_at {
            state
                .metrics
                .record_latency(entry.task.operator, Instant::now().saturating_duration_since(dispatched_at));
        }

        let newly_scheduled =
            self.scheduler.schedule(expression_id, &mut expression.root, &mut state.distributor);

        let Some(result) = expression.root.value() else {
            debug!(
                expression_id = %expression_id,
                task_id = %task_id,
                newly_scheduled,
                "Applied result"
            );
            return Ok(ResultOutcome::Progress { expression_id, newly_scheduled });
        };

        expression.status = ExpressionStatus::Completed;
        expression.result = Some(result);
        let record = expression.record();
        state.forest.remove(&expression_id);
        state.metrics.record_completion();
        info!(expression_id = %expression_id, "Expression completed with {}", result);
        Ok(ResultOutcome::Finished(record))
    }

    /// A worker could not compute `task_id`. The owning expression becomes
    /// `error` and all of its outstanding tasks are dropped.
    pub fn fail_task(&self, task_id: TaskId, reason: &str) -> Result<ExpressionRecord, EngineError> {
        let mut guard = self.lock()?;
        fail_locked(&mut guard, task_id, reason)
    }
}

fn fail_locked(
    state: &mut EngineState,
    task_id: TaskId,
    reason: &str,
) -> Result<ExpressionRecord, EngineError> {
    let expression_id = match state.distributor.lookup(task_id) {
        Ok(entry) => entry.task.expression_id,
        Err(e) => {
            if matches!(e, EngineError::DuplicateResult(_)) {
                state.metrics.duplicates_rejected += 1;
            }
            return Err(e);
        }
    };

    let purged = state.distributor.purge_expression(expression_id);
    let expression = state
        .forest
        .remove(&expression_id)
        .ok_or(EngineError::ExpressionNotFound(expression_id))?;
    state.metrics.expressions_failed += 1;

    warn!(
        expression_id = %expression_id,
        task_id = %task_id,
        purged,
        "Expression failed: {}",
        reason
    );
    Ok(expression.record().failed())
}
