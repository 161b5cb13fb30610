use serde::{Deserialize, Serialize};

use crate::entity::{ExpressionId, ExpressionStatus, OwnerId};

/// Durable view of an expression: what the persistence layer stores and
/// what owners see when they query status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRecord {
    pub id: ExpressionId,
    #[serde(skip)]
    pub owner: OwnerId,
    pub expression: String,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
}

impl ExpressionRecord {
    pub fn pending(id: ExpressionId, owner: OwnerId, expression: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            expression: expression.into(),
            status: ExpressionStatus::Pending,
            result: None,
        }
    }

    pub fn completed(mut self, result: f64) -> Self {
        self.status = ExpressionStatus::Completed;
        self.result = Some(result);
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = ExpressionStatus::Error;
        self.result = None;
        self
    }
}

/// A registered user. `password_hash` is a bcrypt hash string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: OwnerId,
    pub login: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let rec = ExpressionRecord::pending(ExpressionId(1), OwnerId(9), "2+2");
        assert_eq!(rec.status, ExpressionStatus::Pending);
        assert_eq!(rec.result, None);

        let done = rec.clone().completed(4.0);
        assert_eq!(done.status, ExpressionStatus::Completed);
        assert_eq!(done.result, Some(4.0));

        let failed = done.failed();
        assert_eq!(failed.status, ExpressionStatus::Error);
        assert_eq!(failed.result, None);
    }

    #[test]
    fn owner_is_not_serialized() {
        let rec = ExpressionRecord::pending(ExpressionId(5), OwnerId(42), "1+1");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 5, "expression": "1+1", "status": "pending", "result": null})
        );
    }
}
