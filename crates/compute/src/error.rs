use tally_core::{ExpressionId, TaskId};

use crate::parser::ParseError;

/// Failures surfaced by [`crate::Engine`] operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Task {0} not found")]
    TaskNotFound(TaskId),
    #[error("Expression {0} not found")]
    ExpressionNotFound(ExpressionId),
    #[error("Result for task {0} was already applied")]
    DuplicateResult(TaskId),
    #[error("Expression {0} is already scheduled")]
    AlreadyExists(ExpressionId),
    #[error("Internal fault: {0}")]
    InternalFault(String),
}
