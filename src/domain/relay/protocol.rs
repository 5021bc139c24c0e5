//! JSON wire protocol for connected clients.
//!
//! Messages are internally tagged with a `type` field. Room events carry
//! their fully-qualified name in a `name` field rather than as a dynamic
//! message type, so the envelope stays a closed enum.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages a client may send to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Request membership of the room for `account[::project]`.
    Join {
        account: String,
        #[serde(default)]
        project: Option<String>,
    },

    /// Drop membership of the room for `account[::project]`.
    Leave {
        account: String,
        #[serde(default)]
        project: Option<String>,
    },
}

/// Messages the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// A join request succeeded.
    Joined {
        account: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<String>,
    },

    /// The connection has no valid session, or a join was denied.
    CredentialError { message: String },

    /// A queue message fanned out to a room the client is a member of.
    Event { name: String, data: Value },
}
