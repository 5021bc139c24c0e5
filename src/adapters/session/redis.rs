//! Redis implementation of the session resolver.
//!
//! The platform's web tier writes sessions into Redis as JSON records under
//! `sess:<id>` keys (express-session compatible layout). The relay only
//! reads them: a live record with a `user.username` field is an
//! authenticated session, anything else is treated as "no session".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Deserialize;

use crate::domain::foundation::AuthenticatedSession;
use crate::ports::{SessionError, SessionResolver};

/// Session store resolver backed by Redis.
#[derive(Clone)]
pub struct RedisSessionResolver {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl RedisSessionResolver {
    /// Create a resolver reading records under `key_prefix` (usually `sess:`).
    pub fn new(conn: MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }
}

#[async_trait]
impl SessionResolver for RedisSessionResolver {
    async fn resolve(&self, session_id: &str) -> Result<Option<AuthenticatedSession>, SessionError> {
        let key = format!("{}{}", self.key_prefix, session_id);
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e: redis::RedisError| SessionError::Store(e.to_string()))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        Ok(username_from_record(&raw, Utc::now())?
            .map(|username| AuthenticatedSession::new(username, session_id)))
    }
}

/// Session record layout as written by the web tier.
///
/// Only the fields the relay needs are decoded; the rest of the record
/// (cookie settings, flash data) is ignored.
#[derive(Debug, Deserialize)]
struct SessionRecord {
    user: Option<SessionUser>,
    cookie: Option<SessionCookie>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct SessionCookie {
    expires: Option<DateTime<Utc>>,
}

/// Extract the username from a raw session record, if the session is live.
///
/// The store usually expires records itself, but the expiry stamped into
/// the record wins when the two disagree (e.g. a store with persistence
/// restarted past the TTL).
fn username_from_record(raw: &str, now: DateTime<Utc>) -> Result<Option<String>, SessionError> {
    let record: SessionRecord =
        serde_json::from_str(raw).map_err(|e| SessionError::Malformed(e.to_string()))?;

    let expired = record
        .cookie
        .as_ref()
        .and_then(|cookie| cookie.expires)
        .is_some_and(|expires| expires <= now);
    if expired {
        return Ok(None);
    }

    Ok(record.user.map(|user| user.username))
}
