//! Stub access checker for tests and local development.
//!
//! Grants are registered explicitly; everything else is denied. Not for
//! production use.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::ports::{AccessChecker, AccessError};

/// In-memory access checker with explicit grants.
#[derive(Default)]
pub struct StubAccessChecker {
    project_readers: RwLock<HashSet<(String, String, String)>>,
    account_admins: RwLock<HashSet<(String, String)>>,
}

impl StubAccessChecker {
    /// Creates a checker that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `username` read access to `account`/`project`.
    pub fn allow_project_read(&self, username: &str, account: &str, project: &str) {
        self.project_readers
            .write()
            .expect("StubAccessChecker: lock poisoned")
            .insert((
                username.to_string(),
                account.to_string(),
                project.to_string(),
            ));
    }

    /// Grant `username` administrator rights on `account`.
    pub fn allow_account_admin(&self, username: &str, account: &str) {
        self.account_admins
            .write()
            .expect("StubAccessChecker: lock poisoned")
            .insert((username.to_string(), account.to_string()));
    }
}

#[async_trait]
impl AccessChecker for StubAccessChecker {
    async fn has_read_access_to_project(
        &self,
        username: &str,
        account: &str,
        project: &str,
    ) -> Result<bool, AccessError> {
        Ok(self
            .project_readers
            .read()
            .expect("StubAccessChecker: lock poisoned")
            .contains(&(
                username.to_string(),
                account.to_string(),
                project.to_string(),
            )))
    }

    async fn is_account_admin(&self, username: &str, account: &str) -> Result<bool, AccessError> {
        Ok(self
            .account_admins
            .read()
            .expect("StubAccessChecker: lock poisoned")
            .contains(&(username.to_string(), account.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denies_by_default() {
        let checker = StubAccessChecker::new();
        assert!(!checker
            .has_read_access_to_project("alice", "acme", "proj1")
            .await
            .unwrap());
        assert!(!checker.is_account_admin("alice", "acme").await.unwrap());
    }

    #[tokio::test]
    async fn grants_are_scoped() {
        let checker = StubAccessChecker::new();
        checker.allow_project_read("alice", "acme", "proj1");

        assert!(checker
            .has_read_access_to_project("alice", "acme", "proj1")
            .await
            .unwrap());
        assert!(!checker
            .has_read_access_to_project("alice", "acme", "proj2")
            .await
            .unwrap());
        assert!(!checker.is_account_admin("alice", "acme").await.unwrap());
    }
}
