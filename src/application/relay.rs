//! The relay service - connection directory, room registry and fan-out.
//!
//! One `ChatRelay` instance serves every connection of the process. It owns
//! the connection directory and the room subscriber sets explicitly (no
//! process-wide statics) and is driven from two sides:
//!
//! - the WebSocket adapter registers connections and forwards their
//!   `join`/`leave` requests
//! - the event queue adapter pushes [`QueuedEventMessage`]s into
//!   [`EventMessageHandler::handle`] for broadcast
//!
//! Membership changes and broadcasts are fire-and-forget channel sends, not
//! transactions: a connection may appear in or vanish from a room set at
//! any point between a queue message arriving and its delivery, and both
//! sides tolerate that. Locks are held only to snapshot or mutate the maps,
//! never across an await into a collaborator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

use crate::domain::foundation::ConnectionId;
use crate::domain::relay::{QueuedEventMessage, RoomKey, ServerMessage};
use crate::ports::{AccessChecker, AccessError, EventMessageHandler};

/// Live connection handle held in the connection directory.
struct ConnectionHandle {
    username: String,
    session_id: String,
    sender: UnboundedSender<ServerMessage>,
}

/// Pub/sub relay shared by all connections of one server process.
pub struct ChatRelay {
    access: Arc<dyn AccessChecker>,
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    rooms: RwLock<HashMap<RoomKey, HashSet<ConnectionId>>>,
}

impl ChatRelay {
    /// Creates a relay with no connections.
    pub fn new(access: Arc<dyn AccessChecker>) -> Self {
        Self {
            access,
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an authenticated connection and returns its id.
    ///
    /// Messages for the connection are delivered through `sender`; the
    /// transport side owns the receiving half.
    pub async fn register(
        &self,
        username: &str,
        session_id: &str,
        sender: UnboundedSender<ServerMessage>,
    ) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections.write().await.insert(
            id,
            ConnectionHandle {
                username: username.to_string(),
                session_id: session_id.to_string(),
                sender,
            },
        );
        id
    }

    /// Removes a connection from the directory and from every room.
    ///
    /// Safe to call for an id that was never registered or is already gone.
    pub async fn deregister(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&id);
            !members.is_empty()
        });
    }

    /// Handles a join request from a connection.
    ///
    /// Runs the access check for the room and, on success, adds the
    /// connection to the subscriber set and emits `joined` back to it. On
    /// denial the connection receives `credentialError` and no state
    /// changes. Joining a room already held is a no-op success.
    pub async fn join(&self, id: ConnectionId, account: &str, project: Option<&str>) {
        let Some((username, session_id)) = self.connection_identity(id).await else {
            // Disconnected while the request was in flight.
            return;
        };

        let room = RoomKey::new(account, project);
        let allowed = match self.check_access(&username, account, project).await {
            Ok(allowed) => allowed,
            Err(e) => {
                // Fail-closed: a checker failure denies the join.
                tracing::error!(
                    username = %username,
                    room = %room,
                    error = %e,
                    "access check failed, treating as denied"
                );
                false
            }
        };

        if allowed {
            self.rooms
                .write()
                .await
                .entry(room.clone())
                .or_default()
                .insert(id);
            self.send_to(
                id,
                ServerMessage::Joined {
                    account: account.to_string(),
                    project: project.map(str::to_string),
                },
            )
            .await;
            tracing::info!(
                username = %username,
                session_id = %session_id,
                connection_id = %id,
                room = %room,
                "joined room"
            );
        } else {
            self.send_to(
                id,
                ServerMessage::CredentialError {
                    message: format!("You have no access to join room {room}"),
                },
            )
            .await;
            tracing::error!(
                username = %username,
                session_id = %session_id,
                connection_id = %id,
                room = %room,
                "no access to join room"
            );
        }
    }

    /// Handles a leave request from a connection.
    ///
    /// No access check and no emission: leaving a room the connection never
    /// joined is a silent no-op.
    pub async fn leave(&self, id: ConnectionId, account: &str, project: Option<&str>) {
        let room = RoomKey::new(account, project);
        {
            let mut rooms = self.rooms.write().await;
            if let Some(members) = rooms.get_mut(&room) {
                members.remove(&id);
                if members.is_empty() {
                    rooms.remove(&room);
                }
            }
        }
        if let Some((username, session_id)) = self.connection_identity(id).await {
            tracing::info!(
                username = %username,
                session_id = %session_id,
                connection_id = %id,
                room = %room,
                "left room"
            );
        }
    }

    /// Returns whether a connection is currently in the directory.
    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Returns whether a connection is a member of a room.
    pub async fn is_member(&self, id: ConnectionId, room: &RoomKey) -> bool {
        self.rooms
            .read()
            .await
            .get(room)
            .is_some_and(|members| members.contains(&id))
    }

    async fn check_access(
        &self,
        username: &str,
        account: &str,
        project: Option<&str>,
    ) -> Result<bool, AccessError> {
        match project.filter(|p| !p.is_empty()) {
            Some(project) => {
                self.access
                    .has_read_access_to_project(username, account, project)
                    .await
            }
            None => self.access.is_account_admin(username, account).await,
        }
    }

    async fn connection_identity(&self, id: ConnectionId) -> Option<(String, String)> {
        self.connections
            .read()
            .await
            .get(&id)
            .map(|handle| (handle.username.clone(), handle.session_id.clone()))
    }

    async fn send_to(&self, id: ConnectionId, message: ServerMessage) {
        let connections = self.connections.read().await;
        if let Some(handle) = connections.get(&id) {
            if handle.sender.send(message).is_err() {
                tracing::debug!(connection_id = %id, "connection channel closed");
            }
        }
    }
}

#[async_trait]
impl EventMessageHandler for ChatRelay {
    /// Fans a queue message out to the subscribers of its target room,
    /// excluding the originating connection.
    async fn handle(&self, message: QueuedEventMessage) {
        let Some(routing) = message.routing() else {
            tracing::debug!("dropping queue message without account or event");
            return;
        };

        // An emitter that does not parse or is no longer live excludes
        // nobody: the message broadcasts unfiltered.
        let emitter: Option<ConnectionId> = message
            .emitter
            .as_deref()
            .and_then(|raw| raw.parse().ok());

        let members: Vec<ConnectionId> = {
            let rooms = self.rooms.read().await;
            match rooms.get(&routing.room) {
                Some(members) => members.iter().copied().collect(),
                None => return,
            }
        };

        let connections = self.connections.read().await;
        for member in members {
            if Some(member) == emitter {
                continue;
            }
            let Some(handle) = connections.get(&member) else {
                // Deregistered between the room snapshot and delivery.
                continue;
            };
            let delivery = ServerMessage::Event {
                name: routing.event_name.clone(),
                data: message.data.clone(),
            };
            if handle.sender.send(delivery).is_err() {
                tracing::debug!(
                    connection_id = %member,
                    event = %routing.event_name,
                    "dropping event for closed connection"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    /// Access checker with a fixed answer, plus a failing variant.
    enum FixedAccess {
        Allow,
        Deny,
        Fail,
    }

    #[async_trait]
    impl AccessChecker for FixedAccess {
        async fn has_read_access_to_project(
            &self,
            _username: &str,
            _account: &str,
            _project: &str,
        ) -> Result<bool, AccessError> {
            self.answer()
        }

        async fn is_account_admin(
            &self,
            _username: &str,
            _account: &str,
        ) -> Result<bool, AccessError> {
            self.answer()
        }
    }

    impl FixedAccess {
        fn answer(&self) -> Result<bool, AccessError> {
            match self {
                FixedAccess::Allow => Ok(true),
                FixedAccess::Deny => Ok(false),
                FixedAccess::Fail => Err(AccessError::Backend("backend down".to_string())),
            }
        }
    }

    fn relay(access: FixedAccess) -> ChatRelay {
        ChatRelay::new(Arc::new(access))
    }

    async fn connect(relay: &ChatRelay, username: &str) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = relay.register(username, "sid", tx).await;
        (id, rx)
    }

    fn queue_message(
        account: &str,
        project: Option<&str>,
        event: &str,
        emitter: Option<String>,
    ) -> QueuedEventMessage {
        QueuedEventMessage {
            account: Some(account.to_string()),
            project: project.map(String::from),
            extra_keys: Vec::new(),
            event: Some(event.to_string()),
            data: json!({"n": 1}),
            emitter,
        }
    }

    #[tokio::test]
    async fn join_success_emits_joined_and_adds_membership() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;

        relay.join(id, "acme", Some("proj1")).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Joined {
                account: "acme".to_string(),
                project: Some("proj1".to_string()),
            }
        );
        assert!(relay.is_member(id, &RoomKey::new("acme", Some("proj1"))).await);
    }

    #[tokio::test]
    async fn join_denied_emits_credential_error_and_no_membership() {
        let relay = relay(FixedAccess::Deny);
        let (id, mut rx) = connect(&relay, "mallory").await;

        relay.join(id, "acme", None).await;

        match rx.recv().await.unwrap() {
            ServerMessage::CredentialError { message } => {
                assert!(message.contains("acme"));
            }
            other => panic!("expected credentialError, got {other:?}"),
        }
        assert!(!relay.is_member(id, &RoomKey::new("acme", None)).await);
    }

    #[tokio::test]
    async fn checker_failure_is_fail_closed() {
        let relay = relay(FixedAccess::Fail);
        let (id, mut rx) = connect(&relay, "alice").await;

        relay.join(id, "acme", Some("proj1")).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            ServerMessage::CredentialError { .. }
        ));
        assert!(!relay.is_member(id, &RoomKey::new("acme", Some("proj1"))).await);
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;

        relay.join(id, "acme", None).await;
        relay.join(id, "acme", None).await;

        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Joined { .. }));
        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Joined { .. }));
        assert!(relay.is_member(id, &RoomKey::new("acme", None)).await);
    }

    #[tokio::test]
    async fn leave_of_never_joined_room_is_noop() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;

        relay.leave(id, "acme", Some("proj1")).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_removes_membership() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;
        relay.join(id, "acme", None).await;
        let _ = rx.recv().await;

        relay.leave(id, "acme", None).await;

        assert!(!relay.is_member(id, &RoomKey::new("acme", None)).await);
        let msg = queue_message("acme", None, "update", None);
        relay.handle(msg).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_members_under_qualified_name() {
        let relay = relay(FixedAccess::Allow);
        let (x, mut x_rx) = connect(&relay, "alice").await;
        let (_y, mut y_rx) = connect(&relay, "bob").await;
        relay.join(x, "acme", None).await;
        let _ = x_rx.recv().await;

        relay.handle(queue_message("acme", None, "update", None)).await;

        match x_rx.recv().await.unwrap() {
            ServerMessage::Event { name, data } => {
                assert_eq!(name, "acme::update");
                assert_eq!(data, json!({"n": 1}));
            }
            other => panic!("expected event, got {other:?}"),
        }
        // Non-member receives nothing.
        assert!(y_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_includes_extra_keys_in_event_name() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;
        relay.join(id, "acme", Some("proj1")).await;
        let _ = rx.recv().await;

        let mut msg = queue_message("acme", Some("proj1"), "new", None);
        msg.extra_keys = vec!["catA".to_string()];
        relay.handle(msg).await;

        match rx.recv().await.unwrap() {
            ServerMessage::Event { name, .. } => assert_eq!(name, "acme::proj1::catA::new"),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn emitter_does_not_receive_its_own_message() {
        let relay = relay(FixedAccess::Allow);
        let (emitter, mut emitter_rx) = connect(&relay, "alice").await;
        let (other, mut other_rx) = connect(&relay, "bob").await;
        relay.join(emitter, "acme", None).await;
        relay.join(other, "acme", None).await;
        let _ = emitter_rx.recv().await;
        let _ = other_rx.recv().await;

        relay
            .handle(queue_message("acme", None, "update", Some(emitter.to_string())))
            .await;

        assert!(matches!(
            other_rx.recv().await.unwrap(),
            ServerMessage::Event { .. }
        ));
        assert!(emitter_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_emitter_broadcasts_unfiltered() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;
        relay.join(id, "acme", None).await;
        let _ = rx.recv().await;

        relay
            .handle(queue_message(
                "acme",
                None,
                "update",
                Some("not-a-live-connection".to_string()),
            ))
            .await;

        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Event { .. }));
    }

    #[tokio::test]
    async fn malformed_message_is_dropped_silently() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;
        relay.join(id, "acme", None).await;
        let _ = rx.recv().await;

        relay
            .handle(QueuedEventMessage {
                account: None,
                project: None,
                extra_keys: Vec::new(),
                event: Some("update".to_string()),
                data: json!({}),
                emitter: None,
            })
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn deregister_removes_connection_and_memberships() {
        let relay = relay(FixedAccess::Allow);
        let (id, mut rx) = connect(&relay, "alice").await;
        relay.join(id, "acme", None).await;
        let _ = rx.recv().await;

        relay.deregister(id).await;

        assert!(!relay.is_registered(id).await);
        assert!(!relay.is_member(id, &RoomKey::new("acme", None)).await);
        // A later message to the former room must not error.
        relay.handle(queue_message("acme", None, "update", None)).await;
    }

    #[tokio::test]
    async fn delivery_tolerates_dropped_receiver() {
        let relay = relay(FixedAccess::Allow);
        let (id, rx) = connect(&relay, "alice").await;
        relay.join(id, "acme", None).await;
        drop(rx);

        // Sender half is closed but the connection has not deregistered yet.
        relay.handle(queue_message("acme", None, "update", None)).await;
    }

    #[tokio::test]
    async fn join_after_disconnect_is_ignored() {
        let relay = relay(FixedAccess::Allow);
        let (id, rx) = connect(&relay, "alice").await;
        drop(rx);
        relay.deregister(id).await;

        relay.join(id, "acme", None).await;

        assert!(!relay.is_member(id, &RoomKey::new("acme", None)).await);
    }
}
