//! PostgreSQL implementation of AccessChecker.
//!
//! Reads the `parent_children` link table maintained by the account store.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{ChildId, DomainError, UserId};
use crate::ports::AccessChecker;

pub struct PostgresAccessChecker {
    pool: PgPool,
}

impl PostgresAccessChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessChecker for PostgresAccessChecker {
    async fn can_access_child(&self, user_id: &UserId, child_id: &ChildId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM parent_children WHERE parent_id = $1 AND child_id = $2)",
        )
        .bind(user_id.as_str())
        .bind(child_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check child access", e))
    }
}
