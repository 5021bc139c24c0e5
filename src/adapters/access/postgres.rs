//! PostgreSQL implementation of AccessChecker.
//!
//! Queries the platform's permissions tables directly. The pool is created
//! lazily in `main`, so a database that is down at boot surfaces here as a
//! per-query error - which the join flow treats as a denial.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::ports::{AccessChecker, AccessError};

/// PostgreSQL implementation of the AccessChecker port.
pub struct PostgresAccessChecker {
    pool: PgPool,
}

impl PostgresAccessChecker {
    /// Creates a new PostgresAccessChecker with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessChecker for PostgresAccessChecker {
    async fn has_read_access_to_project(
        &self,
        username: &str,
        account: &str,
        project: &str,
    ) -> Result<bool, AccessError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM project_permissions
                WHERE username = $1
                  AND account = $2
                  AND project = $3
                  AND can_read
            )
            "#,
        )
        .bind(username)
        .bind(account)
        .bind(project)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AccessError::Backend(format!("project read access query failed: {e}")))?;

        Ok(exists)
    }

    async fn is_account_admin(&self, username: &str, account: &str) -> Result<bool, AccessError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM account_admins
                WHERE username = $1
                  AND account = $2
            )
            "#,
        )
        .bind(username)
        .bind(account)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AccessError::Backend(format!("account admin query failed: {e}")))?;

        Ok(exists)
    }
}
