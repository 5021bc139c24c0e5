//! Queued event messages consumed from the backend event queue.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::room::{qualified_event_name, RoomKey};

/// Application-level notification produced elsewhere in the platform and
/// handed to the relay for fan-out to connected clients.
///
/// The routing fields are optional on the wire: the backend publishes a
/// variety of shapes on the shared channel and the relay only relays those
/// that carry both an `account` and an `event`. Everything else is dropped
/// without error (malformed-message policy: drop, never crash the relay).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEventMessage {
    /// Account the event is scoped to.
    #[serde(default)]
    pub account: Option<String>,

    /// Project the event is scoped to, if any.
    #[serde(default)]
    pub project: Option<String>,

    /// Extra classification keys appended to the event name.
    #[serde(default)]
    pub extra_keys: Vec<String>,

    /// Short event name, qualified with the room segments on delivery.
    #[serde(default)]
    pub event: Option<String>,

    /// Opaque payload delivered to subscribers verbatim.
    #[serde(default)]
    pub data: Value,

    /// Connection id of the originating client, used for echo suppression.
    #[serde(default)]
    pub emitter: Option<String>,
}

/// Routing decision derived from a well-formed queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRouting {
    /// Room the payload fans out to.
    pub room: RoomKey,

    /// Fully-qualified name the payload is delivered under.
    pub event_name: String,
}

impl QueuedEventMessage {
    /// Computes the routing for this message.
    ///
    /// Returns `None` when `account` or `event` is missing or empty; such
    /// messages are not relayed.
    pub fn routing(&self) -> Option<EventRouting> {
        let account = self.account.as_deref().filter(|a| !a.is_empty())?;
        let event = self.event.as_deref().filter(|e| !e.is_empty())?;
        let project = self.project.as_deref();

        Some(EventRouting {
            room: RoomKey::new(account, project),
            event_name: qualified_event_name(account, project, &self.extra_keys, event),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(account: Option<&str>, project: Option<&str>, event: Option<&str>) -> QueuedEventMessage {
        QueuedEventMessage {
            account: account.map(String::from),
            project: project.map(String::from),
            extra_keys: Vec::new(),
            event: event.map(String::from),
            data: Value::Null,
            emitter: None,
        }
    }

    #[test]
    fn routing_for_account_level_message() {
        let routing = message(Some("acme"), None, Some("update")).routing().unwrap();
        assert_eq!(routing.room.as_str(), "acme");
        assert_eq!(routing.event_name, "acme::update");
    }

    #[test]
    fn routing_for_project_level_message() {
        let routing = message(Some("acme"), Some("proj1"), Some("new"))
            .routing()
            .unwrap();
        assert_eq!(routing.room.as_str(), "acme::proj1");
        assert_eq!(routing.event_name, "acme::proj1::new");
    }

    #[test]
    fn routing_includes_extra_keys_in_name_but_not_room() {
        let mut msg = message(Some("acme"), Some("proj1"), Some("new"));
        msg.extra_keys = vec!["catA".to_string()];
        let routing = msg.routing().unwrap();
        assert_eq!(routing.room.as_str(), "acme::proj1");
        assert_eq!(routing.event_name, "acme::proj1::catA::new");
    }

    #[test]
    fn missing_account_is_not_routed() {
        assert!(message(None, None, Some("update")).routing().is_none());
    }

    #[test]
    fn missing_event_is_not_routed() {
        assert!(message(Some("acme"), None, None).routing().is_none());
    }

    #[test]
    fn empty_account_is_not_routed() {
        assert!(message(Some(""), None, Some("update")).routing().is_none());
    }

    #[test]
    fn deserializes_camel_case_wire_format() {
        let msg: QueuedEventMessage = serde_json::from_str(
            r#"{
                "account": "acme",
                "project": "proj1",
                "extraKeys": ["catA"],
                "event": "new",
                "data": {"id": 42},
                "emitter": "3f2b6b1e-0000-4000-8000-000000000001"
            }"#,
        )
        .unwrap();

        assert_eq!(msg.extra_keys, vec!["catA".to_string()]);
        assert_eq!(msg.data, json!({"id": 42}));
        assert!(msg.emitter.is_some());
    }

    #[test]
    fn deserializes_sparse_message() {
        let msg: QueuedEventMessage = serde_json::from_str(r#"{"event": "ping"}"#).unwrap();
        assert!(msg.account.is_none());
        assert!(msg.extra_keys.is_empty());
        assert_eq!(msg.data, Value::Null);
        assert!(msg.routing().is_none());
    }
}
