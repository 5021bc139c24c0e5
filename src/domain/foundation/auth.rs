//! Authentication types for the domain layer.
//!
//! These types represent an authenticated session resolved from the shared
//! session store. They have **no store dependencies** - any session backend
//! can populate them via the `SessionResolver` port.

/// Authenticated session extracted from the shared session store.
///
/// This is a **domain type** with no backend dependencies. The relay only
/// needs the username (for access checks and logging) and the session id
/// (for logging and correlation with the rest of the platform).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    /// Username the session belongs to.
    pub username: String,

    /// Identifier of the session record in the shared store.
    pub session_id: String,
}

impl AuthenticatedSession {
    /// Creates a new authenticated session.
    ///
    /// Typically called by a `SessionResolver` adapter after a successful
    /// store lookup.
    pub fn new(username: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            session_id: session_id.into(),
        }
    }
}
