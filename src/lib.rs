//! Chat Relay - Real-time event relay for the model collaboration platform.
//!
//! Authenticates WebSocket connections against the shared session store,
//! manages per-account/project room membership, and republishes backend
//! event-queue messages to subscribed clients while suppressing echo to
//! the originating connection.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
