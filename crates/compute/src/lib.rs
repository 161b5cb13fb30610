//! Expression scheduling engine: parses arithmetic expressions into
//! operation trees, hands ready operations to remote workers and folds their
//! results back until every expression resolves.

pub mod distributor;
pub mod engine;
pub mod error;
pub mod parser;
pub mod scheduler;
pub mod tree;

pub use distributor::{Distributor, LeaseState, TaskEntry};
pub use engine::{Engine, Expression, ResultOutcome, Submission};
pub use error::EngineError;
pub use parser::{ParseError, parse};
pub use scheduler::{EngineMetrics, Scheduler, SchedulerConfig, Task};
pub use tree::{Branch, NodePath, OperationNode};
