//! Periodic housekeeping: lease reclamation and queue-depth logging.

use std::sync::Arc;
use std::time::Duration;

use tally_compute::Engine;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Requeue tasks whose worker went silent past the lease.
pub fn spawn_lease_reaper(engine: Arc<Engine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // skip immediate tick

        loop {
            interval.tick().await;
            match engine.reclaim_expired() {
                Ok(0) => {}
                Ok(n) => info!("Reclaimed {} expired task lease(s)", n),
                Err(e) => error!("Lease reaper failed: {}", e),
            }
        }
    })
}

/// Log the pending queue depth while there is work waiting.
pub fn spawn_queue_logger(engine: Arc<Engine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match engine.metrics() {
                Ok(m) if m.queue_depth > 0 => info!(
                    pending = m.queue_depth,
                    in_flight = m.in_flight,
                    live = m.live_expressions,
                    "Task queue"
                ),
                Ok(_) => debug!("Task queue empty"),
                Err(e) => error!("Queue logger failed: {}", e),
            }
        }
    })
}
