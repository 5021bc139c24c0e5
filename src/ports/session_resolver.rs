//! Session resolution port for the shared session store.
//!
//! The relay does not authenticate users itself; it trusts the session the
//! rest of the platform established and only resolves the session id a
//! client presents at connect into a username.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::AuthenticatedSession;

/// Errors that can occur while resolving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session store could not be reached or answered abnormally.
    #[error("Session store error: {0}")]
    Store(String),

    /// A record was found but could not be decoded.
    #[error("Malformed session record: {0}")]
    Malformed(String),
}

/// Resolves a session id into an authenticated session.
///
/// # Contract
///
/// Implementations must:
/// - Return `Ok(None)` for an unknown session id or a session without a
///   logged-in user - that is a normal outcome, not an error
/// - Return `Err(SessionError::Store)` only for transport-level failures
/// - Never create or refresh sessions; the relay is read-only
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Look up a session id in the shared store.
    async fn resolve(&self, session_id: &str) -> Result<Option<AuthenticatedSession>, SessionError>;
}
