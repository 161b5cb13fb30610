use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::config::{OperationsConfig, SchedulerEnvConfig};
use tally_core::{ExpressionId, Operator, TaskId, TaskPayload};

/// Engine configuration: per-operator duration hints and the lease length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Advisory duration for `+` in milliseconds.
    #[serde(default = "default_op_ms")]
    pub addition_ms: u64,
    /// Advisory duration for `-` in milliseconds.
    #[serde(default = "default_op_ms")]
    pub subtraction_ms: u64,
    /// Advisory duration for `*` in milliseconds.
    #[serde(default = "default_op_ms")]
    pub multiplication_ms: u64,
    /// Advisory duration for `/` in milliseconds.
    #[serde(default = "default_op_ms")]
    pub division_ms: u64,
    /// How long a pulled task may stay unanswered before it is requeued.
    #[serde(default = "default_task_lease_secs")]
    pub task_lease_secs: u64,
}

fn default_op_ms() -> u64 { 10 }
fn default_task_lease_secs() -> u64 { 30 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            addition_ms: default_op_ms(),
            subtraction_ms: default_op_ms(),
            multiplication_ms: default_op_ms(),
            division_ms: default_op_ms(),
            task_lease_secs: default_task_lease_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Build from the environment-backed process configuration.
    pub fn from_core(ops: &OperationsConfig, scheduler: &SchedulerEnvConfig) -> Self {
        Self {
            addition_ms: ops.addition_ms,
            subtraction_ms: ops.subtraction_ms,
            multiplication_ms: ops.multiplication_ms,
            division_ms: ops.division_ms,
            task_lease_secs: scheduler.task_lease_secs,
        }
    }

    /// Duration hint attached to tasks for `operator`.
    pub fn operation_time(&self, operator: Operator) -> Duration {
        let ms = match operator {
            Operator::Add => self.addition_ms,
            Operator::Sub => self.subtraction_ms,
            Operator::Mul => self.multiplication_ms,
            Operator::Div => self.division_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn lease_timeout(&self) -> Duration {
        Duration::from_secs(self.task_lease_secs)
    }
}

/// One atomic binary operation ready for a worker. Operands are resolved
/// scalars, never references back into the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    pub left: f64,
    pub right: f64,
    pub operator: Operator,
    pub operation_time: Duration,
}

impl Task {
    /// Wire form handed to workers.
    pub fn payload(&self) -> TaskPayload {
        TaskPayload {
            id: self.id,
            arg1: self.left,
            arg2: self.right,
            operation: self.operator,
            operation_time: self.operation_time.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        for op in Operator::ALL {
            assert_eq!(config.operation_time(op), Duration::from_millis(10));
        }
        assert_eq!(config.lease_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn operation_time_per_operator() {
        let config = SchedulerConfig {
            addition_ms: 1,
            subtraction_ms: 2,
            multiplication_ms: 3,
            division_ms: 4,
            ..Default::default()
        };
        assert_eq!(config.operation_time(Operator::Add), Duration::from_millis(1));
        assert_eq!(config.operation_time(Operator::Sub), Duration::from_millis(2));
        assert_eq!(config.operation_time(Operator::Mul), Duration::from_millis(3));
        assert_eq!(config.operation_time(Operator::Div), Duration::from_millis(4));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"division_ms": 250}"#).unwrap();
        assert_eq!(config.division_ms, 250);
        assert_eq!(config.addition_ms, 10);
        assert_eq!(config.task_lease_secs, 30);
    }

    #[test]
    fn from_core_copies_fields() {
        let ops = OperationsConfig { addition_ms: 5, ..Default::default() };
        let env = SchedulerEnvConfig {
            task_lease_secs: 7,
            lease_reap_interval_secs: 1,
            queue_log_interval_secs: 1,
        };
        let config = SchedulerConfig::from_core(&ops, &env);
        assert_eq!(config.addition_ms, 5);
        assert_eq!(config.multiplication_ms, 10);
        assert_eq!(config.lease_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn payload_carries_millis() {
        let task = Task {
            id: TaskId(9),
            expression_id: ExpressionId(1),
            left: 3.0,
            right: 4.0,
            operator: Operator::Mul,
            operation_time: Duration::from_millis(25),
        };
        let payload = task.payload();
        assert_eq!(payload.id, TaskId(9));
        assert_eq!(payload.arg1, 3.0);
        assert_eq!(payload.arg2, 4.0);
        assert_eq!(payload.operation, Operator::Mul);
        assert_eq!(payload.operation_time, 25);
    }
}
