use std::sync::Arc;

use tally_compute::Engine;
use tally_core::ExpressionRecord;
use tally_storage::{ExpressionStore, StoreError, UserStore};
use tracing::error;

use crate::identity::IdentityPort;

/// Shared handles passed to every request handler.
pub struct AppState {
    pub engine: Arc<Engine>,
    pub expressions: Arc<dyn ExpressionStore>,
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityPort>,
    /// bcrypt cost for new password hashes.
    pub password_cost: u32,
}

impl AppState {
    /// Durably record a terminal status. Engine state is not rolled back on
    /// failure, so the stored row stays `pending`.
    pub async fn persist_terminal(&self, record: &ExpressionRecord) -> Result<(), StoreError> {
        self.expressions.update_expression(record).await.map_err(|e| {
            error!(expression_id = %record.id, "Failed to persist {} status: {}", record.status, e);
            e
        })
    }
}
