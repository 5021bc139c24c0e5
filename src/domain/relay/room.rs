//! Room keys and qualified event names.
//!
//! Rooms are named broadcast groups scoped to an account and optionally a
//! project. Both the membership key and the event names delivered into a
//! room are plain `::`-separated strings; the relay never interprets them
//! beyond concatenation, which keeps extra classification keys (object or
//! category identifiers appended by the backend) opaque.
//!
//! Naming scheme:
//!
//! - room key: `account` or `account::project`
//! - event name: `account[::project][::extraKey]*::event`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the segments of room keys and event names.
const SEPARATOR: &str = "::";

/// Composite key identifying a room.
///
/// An empty project is treated the same as an absent one, matching how the
/// backend populates queue messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// Builds the room key for an account and optional project.
    pub fn new(account: &str, project: Option<&str>) -> Self {
        match normalize(project) {
            Some(project) => Self(format!("{account}{SEPARATOR}{project}")),
            None => Self(account.to_string()),
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the fully-qualified event name a payload is delivered under.
///
/// Extra classification keys are appended between the room segments and the
/// event so clients can subscribe to narrower channels without the relay
/// understanding the message semantics.
pub fn qualified_event_name(
    account: &str,
    project: Option<&str>,
    extra_keys: &[String],
    event: &str,
) -> String {
    let mut name = RoomKey::new(account, project).0;
    for key in extra_keys {
        name.push_str(SEPARATOR);
        name.push_str(key);
    }
    name.push_str(SEPARATOR);
    name.push_str(event);
    name
}

fn normalize(segment: Option<&str>) -> Option<&str> {
    segment.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn room_key_account_only() {
        assert_eq!(RoomKey::new("acme", None).as_str(), "acme");
    }

    #[test]
    fn room_key_with_project() {
        assert_eq!(
            RoomKey::new("acme", Some("proj1")).as_str(),
            "acme::proj1"
        );
    }

    #[test]
    fn room_key_empty_project_is_account_only() {
        assert_eq!(RoomKey::new("acme", Some("")).as_str(), "acme");
    }

    #[test]
    fn event_name_without_project() {
        assert_eq!(
            qualified_event_name("acme", None, &[], "update"),
            "acme::update"
        );
    }

    #[test]
    fn event_name_with_project() {
        assert_eq!(
            qualified_event_name("acme", Some("proj1"), &[], "new"),
            "acme::proj1::new"
        );
    }

    #[test]
    fn event_name_with_extra_keys() {
        let extras = vec!["catA".to_string()];
        assert_eq!(
            qualified_event_name("acme", Some("proj1"), &extras, "new"),
            "acme::proj1::catA::new"
        );
    }

    #[test]
    fn event_name_with_multiple_extra_keys() {
        let extras = vec!["catA".to_string(), "objB".to_string()];
        assert_eq!(
            qualified_event_name("acme", None, &extras, "changed"),
            "acme::catA::objB::changed"
        );
    }

    proptest! {
        #[test]
        fn event_name_is_prefixed_by_room_key(
            account in "[a-zA-Z0-9_-]{1,16}",
            project in proptest::option::of("[a-zA-Z0-9_-]{1,16}"),
            extras in proptest::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4),
            event in "[a-zA-Z0-9_-]{1,16}",
        ) {
            let room = RoomKey::new(&account, project.as_deref());
            let name = qualified_event_name(&account, project.as_deref(), &extras, &event);
            prop_assert!(name.starts_with(room.as_str()));
            let suffix = format!("::{}", event);
            prop_assert!(name.ends_with(&suffix));
        }

        #[test]
        fn event_name_segment_count(
            account in "[a-zA-Z0-9_-]{1,16}",
            extras in proptest::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4),
            event in "[a-zA-Z0-9_-]{1,16}",
        ) {
            let name = qualified_event_name(&account, None, &extras, &event);
            prop_assert_eq!(name.split("::").count(), 2 + extras.len());
        }
    }
}
