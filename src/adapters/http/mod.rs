//! WebSocket transport adapter (axum).

mod ws;

pub use ws::{chat_ws_handler, RelayState};

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the relay router with the WebSocket endpoint mounted at `ws_path`.
pub fn router(state: RelayState, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(chat_ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
