//! Event queue port - push-based consumption of backend event messages.
//!
//! The backend publishes [`QueuedEventMessage`]s on an external broker with
//! at-least-once delivery. The relay registers a handler once at startup
//! and is then driven by the broker; it never polls.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::relay::QueuedEventMessage;

/// Errors that can occur while setting up queue consumption.
///
/// These are fatal to relay startup: without a queue there is nothing to
/// fan out, so `main` propagates them instead of retrying.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Connecting to the broker failed.
    #[error("Queue connection failed: {0}")]
    Connect(String),

    /// Subscribing to the event channel failed.
    #[error("Queue subscription failed: {0}")]
    Subscribe(String),
}

/// Handler invoked once per queued event message.
///
/// Implementations must tolerate duplicates (at-least-once delivery) and
/// must not fail: a message that cannot be processed is dropped, never
/// retried and never allowed to take the consumer down.
#[async_trait]
pub trait EventMessageHandler: Send + Sync {
    /// Process one message from the queue.
    async fn handle(&self, message: QueuedEventMessage);
}

/// Port for subscribing to the backend event queue.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Start consuming messages, invoking `handler` for each one.
    ///
    /// Returns once the subscription is established; delivery continues in
    /// the background for the lifetime of the process.
    async fn consume(&self, handler: Arc<dyn EventMessageHandler>) -> Result<(), QueueError>;
}
