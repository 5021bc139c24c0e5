//! WebSocket handler for the chat relay.
//!
//! # Connection Flow
//! 1. Client requests WebSocket upgrade, presenting its session cookie
//!    (or the same value as a query parameter - shim for native clients
//!    that cannot set cookies)
//! 2. The upgrade always succeeds at the transport level
//! 3. The session id is resolved against the shared session store; a
//!    connection without a resolvable session receives one
//!    `credentialError` and is then inert until it goes away
//! 4. Authenticated connections register with the relay and exchange
//!    `join`/`leave` requests and room events until disconnect
//! 5. On disconnect or socket error, the connection is deregistered from
//!    the directory and all rooms

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::ChatRelay;
use crate::domain::foundation::AuthenticatedSession;
use crate::domain::relay::{ClientMessage, ServerMessage};
use crate::ports::SessionResolver;

// ════════════════════════════════════════════════════════════════════════════════
// WebSocket State
// ════════════════════════════════════════════════════════════════════════════════

/// State required for relay WebSocket handling.
#[derive(Clone)]
pub struct RelayState {
    /// The relay instance shared by all connections.
    pub relay: Arc<ChatRelay>,
    /// Resolver for the shared session store.
    pub sessions: Arc<dyn SessionResolver>,
    /// Name of the session cookie (and fallback query parameter).
    pub cookie_name: String,
}

impl RelayState {
    /// Create new WebSocket state.
    pub fn new(
        relay: Arc<ChatRelay>,
        sessions: Arc<dyn SessionResolver>,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            relay,
            sessions,
            cookie_name: cookie_name.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// WebSocket Upgrade Handler
// ════════════════════════════════════════════════════════════════════════════════

/// Handle WebSocket upgrade for the relay endpoint.
///
/// The upgrade is never rejected for missing credentials; authorization is
/// enforced at the message level after connect.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let token = session_token(&headers, &params, &state.cookie_name);
    ws.on_upgrade(move |socket| handle_socket(socket, token, state))
}

// ════════════════════════════════════════════════════════════════════════════════
// Connection Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, token: Option<String>, state: RelayState) {
    let session = match &token {
        Some(session_id) => match state.sessions.resolve(session_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                None
            }
        },
        None => None,
    };

    match session {
        Some(session) => run_authenticated(socket, session, state).await,
        None => reject_without_credential(socket).await,
    }
}

/// Notify an unauthenticated connection and keep it inert until it closes.
async fn reject_without_credential(mut socket: WebSocket) {
    tracing::error!("socket connection without credential");

    let notice = ServerMessage::CredentialError {
        message: "Connection without credential".to_string(),
    };
    if let Ok(json) = serde_json::to_string(&notice) {
        let _ = socket.send(Message::Text(json)).await;
    }

    // The transport stays open but no further events are processed.
    while let Some(result) = socket.recv().await {
        match result {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

/// Run the message loop for an authenticated connection.
async fn run_authenticated(socket: WebSocket, session: AuthenticatedSession, state: RelayState) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = state
        .relay
        .register(&session.username, &session.session_id, outbound_tx)
        .await;

    tracing::info!(
        username = %session.username,
        session_id = %session.session_id,
        connection_id = %conn_id,
        "client is in chat"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound pump: relay -> client. Ends when the relay drops the sender
    // (deregistration) or the transport goes away.
    let outbound = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode server message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: join/leave requests, processed in arrival order so two
    // requests from the same connection never reorder.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Join { account, project }) => {
                    state
                        .relay
                        .join(conn_id, &account, project.as_deref())
                        .await;
                }
                Ok(ClientMessage::Leave { account, project }) => {
                    state
                        .relay
                        .leave(conn_id, &account, project.as_deref())
                        .await;
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %conn_id,
                        error = %e,
                        "unparseable client message"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                // Per-connection failure only; other connections are unaffected
                // and the client is expected to reconnect.
                tracing::error!(connection_id = %conn_id, error = %e, "socket error");
                break;
            }
        }
    }

    state.relay.deregister(conn_id).await;
    outbound.abort();

    tracing::info!(
        username = %session.username,
        connection_id = %conn_id,
        "client left chat"
    );
}

// ════════════════════════════════════════════════════════════════════════════════
// Handshake Helpers
// ════════════════════════════════════════════════════════════════════════════════

/// Extract the session id from handshake metadata.
///
/// The cookie header wins; the query parameter of the same name is the
/// fallback for clients that cannot set cookies (native/embedded viewers).
fn session_token(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    cookie_name: &str,
) -> Option<String> {
    cookie_value(headers, cookie_name)
        .or_else(|| query.get(cookie_name).cloned())
        .map(|raw| normalize_session_token(&raw))
        .filter(|sid| !sid.is_empty())
}

/// Find a cookie by name in the `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Normalize a session cookie value to the bare session id.
///
/// The web tier writes signed cookies in the `s:<sid>.<signature>` store
/// format, which arrives percent-encoded from browsers. The signature is
/// not verified here; the id is only a store lookup key.
fn normalize_session_token(value: &str) -> String {
    let value = value
        .strip_prefix("s%3A")
        .or_else(|| value.strip_prefix("s:"))
        .unwrap_or(value);
    match value.split_once('.') {
        Some((sid, _signature)) => sid.to_string(),
        None => value.to_string(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════
