//! Work Distributor: FIFO pull queue of pending tasks plus the registry that
//! correlates a worker's result with the node that produced the task.
//!
//! The distributor is not synchronised on its own. It lives inside the
//! engine's single critical section together with the expression forest, so
//! a collapse and the reschedule that follows it are never observed halfway.
//!
//! Ids are allocated from a monotonic counter and enqueued straight away, so
//! an id below the counter that is missing from the registry was either
//! consumed or purged. Only purged ids are remembered; everything else below
//! the watermark is a duplicate delivery.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use tally_core::{ExpressionId, TaskId};

use crate::error::EngineError;
use crate::scheduler::Task;
use crate::tree::NodePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    Queued,
    Leased { deadline: Instant },
}

#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub task: Task,
    /// Location of the emitting node inside its expression's tree.
    pub path: NodePath,
    pub state: LeaseState,
    /// Most recent hand-out, if any.
    pub dispatched_at: Option<Instant>,
}

#[derive(Debug)]
pub struct Distributor {
    queue: VecDeque<TaskId>,
    registry: HashMap<TaskId, TaskEntry>,
    /// Ids dropped with their expression. Results for these are `TaskNotFound`.
    purged: HashSet<TaskId>,
    next_id: u64,
    lease_timeout: Duration,
}

impl Distributor {
    pub fn new(lease_timeout: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            registry: HashMap::new(),
            purged: HashSet::new(),
            next_id: 1,
            lease_timeout,
        }
    }

    /// Allocate the next task id. Ids are never reused.
    pub fn next_task_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append to the tail and record the task. Never blocks, never rejects.
    pub fn enqueue(&mut self, task: Task, path: NodePath) {
        let id = task.id;
        self.registry.insert(
            id,
            TaskEntry { task, path, state: LeaseState::Queued, dispatched_at: None },
        );
        self.queue.push_back(id);
    }

    /// Hand out the head of the queue under a lease, or `None` when there is
    /// nothing pending.
    pub fn dequeue(&mut self, now: Instant) -> Option<Task> {
        while let Some(id) = self.queue.pop_front() {
            let Some(entry) = self.registry.get_mut(&id) else {
                continue;
            };
            if entry.state != LeaseState::Queued {
                continue;
            }
            entry.state = LeaseState::Leased { deadline: now + self.lease_timeout };
            entry.dispatched_at = Some(now);
            return Some(entry.task.clone());
        }
        None
    }

    /// Read-only retrieval; does not consume the task.
    pub fn lookup(&self, id: TaskId) -> Result<&TaskEntry, EngineError> {
        self.registry.get(&id).ok_or_else(|| self.missing(id))
    }

    /// Remove the task for good. A second call for the same id reports
    /// `DuplicateResult`; an id that was never issued, or was purged,
    /// reports `TaskNotFound`.
    pub fn consume(&mut self, id: TaskId) -> Result<TaskEntry, EngineError> {
        let Some(entry) = self.registry.remove(&id) else {
            return Err(self.missing(id));
        };
        if entry.state == LeaseState::Queued {
            self.queue.retain(|queued| *queued != id);
        }
        Ok(entry)
    }

    /// Classify an id that has no registry entry.
    fn missing(&self, id: TaskId) -> EngineError {
        let issued = id.0 != 0 && id.0 < self.next_id;
        if issued && !self.purged.contains(&id) {
            EngineError::DuplicateResult(id)
        } else {
            EngineError::TaskNotFound(id)
        }
    }

    /// Return every lease whose deadline has passed to the tail of the queue,
    /// oldest task first.
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<TaskId> {
        let mut expired: Vec<TaskId> = self
            .registry
            .iter()
            .filter(|(_, entry)| matches!(entry.state, LeaseState::Leased { deadline } if deadline <= now))
            .map(|(id, _)| *id)
            .collect();
        expired.sort();

        for id in &expired {
            if let Some(entry) = self.registry.get_mut(id) {
                entry.state = LeaseState::Queued;
            }
            self.queue.push_back(*id);
        }
        expired
    }

    /// Drop every queued or leased task of `expression_id`. Returns how many
    /// were removed. Late results for them report `TaskNotFound`.
    pub fn purge_expression(&mut self, expression_id: ExpressionId) -> usize {
        let purged = &mut self.purged;
        let before = self.registry.len();
        self.registry.retain(|id, entry| {
            let keep = entry.task.expression_id != expression_id;
            if !keep {
                purged.insert(*id);
            }
            keep
        });
        let registry = &self.registry;
        self.queue.retain(|id| registry.contains_key(id));
        before - self.registry.len()
    }

    /// Tasks waiting to be pulled.
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Tasks pulled and not yet answered.
    pub fn in_flight_len(&self) -> usize {
        self.registry
            .values()
            .filter(|entry| matches!(entry.state, LeaseState::Leased { .. }))
            .count()
    }
}
