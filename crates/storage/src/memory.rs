//! In-process backend used when PostgreSQL is not configured, and by tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tally_core::{ExpressionId, ExpressionRecord, OwnerId, UserRecord};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{ExpressionStore, UserStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserRecord>,
    expressions: BTreeMap<i64, ExpressionRecord>,
    next_user_id: i64,
    next_expression_id: i64,
}

/// Both stores backed by maps. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpressionStore for MemoryStore {
    async fn create_expression(&self, owner: OwnerId, text: &str) -> Result<ExpressionRecord, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_expression_id += 1;
        let id = ExpressionId(tables.next_expression_id);
        let record = ExpressionRecord::pending(id, owner, text);
        tables.expressions.insert(id.0, record.clone());
        Ok(record)
    }

    async fn update_expression(&self, record: &ExpressionRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .expressions
            .get_mut(&record.id.0)
            .ok_or_else(|| StoreError::NotFound(format!("expression {}", record.id)))?;
        row.status = record.status;
        row.result = record.result;
        Ok(())
    }

    async fn get_expression(&self, id: ExpressionId, owner: OwnerId) -> Result<ExpressionRecord, StoreError> {
        let tables = self.tables.read().await;
        tables
            .expressions
            .get(&id.0)
            .filter(|row| row.owner == owner)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("expression {}", id)))
    }

    async fn list_expressions(&self, owner: OwnerId) -> Result<Vec<ExpressionRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .expressions
            .values()
            .filter(|row| row.owner == owner)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.login == login) {
            return Err(StoreError::Duplicate(format!("login '{}'", login)));
        }
        tables.next_user_id += 1;
        let user = UserRecord {
            id: OwnerId(tables.next_user_id),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        };
        tables.users.insert(user.id.0, user.clone());
        Ok(user)
    }

    async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.login == login).cloned())
    }
}
