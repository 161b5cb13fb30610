//! PostgreSQL backend for the `users` and `expressions` tables.
//!
//! Queries are built at runtime with `sqlx::query_as`; the schema lives in
//! the workspace `migrations/` directory.

use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::{ExpressionId, ExpressionRecord, ExpressionStatus, OwnerId, UserRecord};
use tracing::error;

use crate::error::StoreError;
use crate::store::{ExpressionStore, UserStore};

#[derive(Debug, sqlx::FromRow)]
struct ExpressionRow {
    id: i64,
    user_id: i64,
    expression: String,
    status: String,
    result: Option<f64>,
}

impl TryFrom<ExpressionRow> for ExpressionRecord {
    type Error = StoreError;

    fn try_from(row: ExpressionRow) -> Result<Self, Self::Error> {
        let status: ExpressionStatus = row.status.parse().map_err(StoreError::Other)?;
        Ok(ExpressionRecord {
            id: ExpressionId(row.id),
            owner: OwnerId(row.user_id),
            expression: row.expression,
            status,
            result: row.result,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    login: String,
    password_hash: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord { id: OwnerId(row.id), login: row.login, password_hash: row.password_hash }
    }
}

/// Both stores on one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpressionStore for PgStore {
    async fn create_expression(&self, owner: OwnerId, text: &str) -> Result<ExpressionRecord, StoreError> {
        let row = sqlx::query_as::<_, ExpressionRow>(
            "INSERT INTO expressions (user_id, expression, status)
             VALUES ($1, $2, 'pending')
             RETURNING id, user_id, expression, status, result",
        )
        .bind(owner.0)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(log_db_error)?;

        row.try_into()
    }

    async fn update_expression(&self, record: &ExpressionRecord) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE expressions
             SET status = $1, result = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(record.status.as_str())
        .bind(record.result)
        .bind(record.id.0)
        .execute(&self.pool)
        .await
        .map_err(log_db_error)?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("expression {}", record.id)));
        }
        Ok(())
    }

    async fn get_expression(&self, id: ExpressionId, owner: OwnerId) -> Result<ExpressionRecord, StoreError> {
        let row = sqlx::query_as::<_, ExpressionRow>(
            "SELECT id, user_id, expression, status, result
             FROM expressions
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id.0)
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(log_db_error)?
        .ok_or_else(|| StoreError::NotFound(format!("expression {}", id)))?;

        row.try_into()
    }

    async fn list_expressions(&self, owner: OwnerId) -> Result<Vec<ExpressionRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ExpressionRow>(
            "SELECT id, user_id, expression, status, result
             FROM expressions
             WHERE user_id = $1
             ORDER BY id",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(log_db_error)?;

        rows.into_iter().map(ExpressionRecord::try_from).collect()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let result = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (login, password_hash)
             VALUES ($1, $2)
             RETURNING id, login, password_hash",
        )
        .bind(login)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(e) => Err(map_unique_violation(e, login)),
        }
    }

    async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, login, password_hash FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(log_db_error)?;

        Ok(row.map(UserRecord::from))
    }
}

fn log_db_error(e: sqlx::Error) -> StoreError {
    error!("expression store database error: {}", e);
    StoreError::Database(e)
}

/// Translate a unique-constraint violation (SQLSTATE 23505) on `users.login`.
fn map_unique_violation(e: sqlx::Error, login: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Duplicate(format!("login '{}'", login));
        }
    }
    log_db_error(e)
}
