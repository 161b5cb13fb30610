//! The engine facade: one explicitly constructed instance per process,
//! shared as `Arc<Engine>` by every request handler.
//!
//! All mutable state (the expression forest, the distributor and the
//! metrics) sits behind a single mutex, so collapsing a node and
//! rescheduling its parent happen in one critical section.
//!
//! Split into focused submodules:
//! - `core`: Engine struct, submission, pulling, status and metrics
//! - `sink`: applying worker results and failures
//! - `housekeeping`: lease reclamation and queue inspection

mod core;
mod housekeeping;
mod sink;
#[cfg(test)]
mod tests;

use tally_core::{ExpressionId, ExpressionRecord};

pub use self::core::{Engine, Expression};

/// What happened to a freshly submitted expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Registered; `tasks_emitted` tasks are waiting for workers.
    Scheduled { record: ExpressionRecord, tasks_emitted: usize },
    /// The expression was a lone literal and is already complete. It was
    /// never registered.
    Completed(ExpressionRecord),
}

impl Submission {
    pub fn record(&self) -> &ExpressionRecord {
        match self {
            Submission::Scheduled { record, .. } | Submission::Completed(record) => record,
        }
    }
}

/// Effect of applying one worker result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOutcome {
    /// A node collapsed; `newly_scheduled` tasks were unlocked by it.
    Progress { expression_id: ExpressionId, newly_scheduled: usize },
    /// The root collapsed. The expression has left the engine.
    Finished(ExpressionRecord),
    /// The result was unusable and the expression was failed.
    Failed(ExpressionRecord),
}

impl ResultOutcome {
    /// Terminal record to persist, if the expression just finished or failed.
    pub fn terminal(&self) -> Option<&ExpressionRecord> {
        match self {
            ResultOutcome::Progress { .. } => None,
            ResultOutcome::Finished(record) | ResultOutcome::Failed(record) => Some(record),
        }
    }
}
