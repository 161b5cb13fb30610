//! Scheduler: discovers ready nodes in an operation tree and turns them into
//! tasks for the [`crate::distributor::Distributor`].
//!
//! - `pass`: the post-order ready-set walk
//! - `core`: the `Scheduler` that stamps tasks and enqueues them
//! - `types`: configuration and the `Task` unit of work
//! - `metrics`: counters kept by the engine

mod core;
pub mod metrics;
pub mod pass;
pub mod types;

pub use self::core::Scheduler;
pub use metrics::EngineMetrics;
pub use pass::{ReadyOp, collect_ready, ready_paths};
pub use types::{SchedulerConfig, Task};
