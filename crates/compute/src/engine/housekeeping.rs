use std::time::Instant;

use tracing::warn;

use super::Engine;
use crate::error::EngineError;

impl Engine {
    /// Requeue every task whose lease has expired. Returns how many were
    /// reclaimed.
    pub fn reclaim_expired(&self) -> Result<usize, EngineError> {
        self.reclaim_expired_at(Instant::now())
    }

    pub(crate) fn reclaim_expired_at(&self, now: Instant) -> Result<usize, EngineError> {
        let mut state = self.lock()?;
        let reclaimed = state.distributor.reclaim_expired(now);
        if reclaimed.is_empty() {
            return Ok(0);
        }

        state.metrics.leases_reclaimed += reclaimed.len() as u64;
        for id in &reclaimed {
            warn!(task_id = %id, "Lease expired, task requeued");
        }
        Ok(reclaimed.len())
    }

    /// Tasks currently waiting to be pulled.
    pub fn queue_depth(&self) -> Result<usize, EngineError> {
        Ok(self.lock()?.distributor.pending_len())
    }
}
