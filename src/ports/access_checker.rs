//! Access control port for room membership.
//!
//! Two policies exist, selected by whether a project is part of the room
//! key: joining a project room requires read access to that project, while
//! joining a bare account room requires account administrator rights.
//!
//! # Design
//!
//! Callers must treat a checker failure as a denial (**fail-closed**): the
//! port surfaces backend errors so they can be logged distinctly from a
//! clean `false`, but no partial access exists at the join site.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while querying the permissions backend.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The permissions backend could not be reached or the query failed.
    #[error("Permissions backend error: {0}")]
    Backend(String),
}

/// Port for checking whether a user may join a room.
#[async_trait]
pub trait AccessChecker: Send + Sync {
    /// Check whether `username` has read access to `project` under `account`.
    async fn has_read_access_to_project(
        &self,
        username: &str,
        account: &str,
        project: &str,
    ) -> Result<bool, AccessError>;

    /// Check whether `username` is an administrator of `account`.
    async fn is_account_admin(&self, username: &str, account: &str) -> Result<bool, AccessError>;
}
