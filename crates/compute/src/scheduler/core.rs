use tally_core::ExpressionId;
use tracing::debug;

use crate::distributor::Distributor;
use crate::scheduler::pass::collect_ready;
use crate::scheduler::types::{SchedulerConfig, Task};
use crate::tree::OperationNode;

/// Turns ready nodes into tasks. Stateless apart from its configuration, so
/// it is safe to invoke after every single result arrival.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Emit a task for every ready node of `root` into `distributor`.
    /// Returns how many were emitted; zero when nothing new became ready.
    pub fn schedule(
        &self,
        expression_id: ExpressionId,
        root: &mut OperationNode,
        distributor: &mut Distributor,
    ) -> usize {
        let ready = collect_ready(root);
        let emitted = ready.len();

        for op in ready {
            let task = Task {
                id: distributor.next_task_id(),
                expression_id,
                left: op.left,
                right: op.right,
                operator: op.operator,
                operation_time: self.config.operation_time(op.operator),
            };
            debug!(
                expression_id = %expression_id,
                task_id = %task.id,
                "Emitted task {} {} {}",
                task.left,
                task.operator,
                task.right
            );
            distributor.enqueue(task, op.path);
        }

        emitted
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use tally_core::Operator;

    use super::*;
    use crate::parser::parse;
    use crate::tree::{Branch, NodePath};

    #[test]
    fn schedule_enqueues_with_operation_time() {
        let config = SchedulerConfig { multiplication_ms: 40, ..Default::default() };
        let scheduler = Scheduler::new(config);
        let mut distributor = Distributor::new(Duration::from_secs(30));
        let mut tree = parse("2+3*4").unwrap();

        assert_eq!(scheduler.schedule(ExpressionId(1), &mut tree, &mut distributor), 1);
        let task = distributor.dequeue(Instant::now()).unwrap();
        assert_eq!(task.operator, Operator::Mul);
        assert_eq!((task.left, task.right), (3.0, 4.0));
        assert_eq!(task.operation_time, Duration::from_millis(40));
        assert_eq!(task.expression_id, ExpressionId(1));

        let entry = distributor.lookup(task.id).unwrap();
        assert_eq!(entry.path, NodePath::root().child(Branch::Right));
    }

    #[test]
    fn rescheduling_same_state_emits_nothing() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let mut distributor = Distributor::new(Duration::from_secs(30));
        let mut tree = parse("(1+2)*(3+4)").unwrap();

        assert_eq!(scheduler.schedule(ExpressionId(1), &mut tree, &mut distributor), 2);
        assert_eq!(scheduler.schedule(ExpressionId(1), &mut tree, &mut distributor), 0);
        assert_eq!(distributor.pending_len(), 2);
    }
}
