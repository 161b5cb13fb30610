use async_trait::async_trait;
use tally_core::{ExpressionId, ExpressionRecord, OwnerId, UserRecord};

use crate::error::StoreError;

/// Durable record of expressions. The engine's callers touch it only when an
/// expression is created and when it reaches a terminal status.
#[async_trait]
pub trait ExpressionStore: Send + Sync {
    /// Insert a `pending` row and return it with its assigned id.
    async fn create_expression(&self, owner: OwnerId, text: &str) -> Result<ExpressionRecord, StoreError>;

    /// Overwrite status and result of an existing row.
    async fn update_expression(&self, record: &ExpressionRecord) -> Result<(), StoreError>;

    /// Fetch one expression. Rows owned by someone else are `NotFound`.
    async fn get_expression(&self, id: ExpressionId, owner: OwnerId) -> Result<ExpressionRecord, StoreError>;

    /// All expressions of `owner`, oldest first.
    async fn list_expressions(&self, owner: OwnerId) -> Result<Vec<ExpressionRecord>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a login. Taken logins are `Duplicate`.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError>;
}
