//! In-memory event queue implementation for testing.
//!
//! Provides synchronous, deterministic message delivery for unit and
//! integration tests.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned. Production code uses the Redis event queue adapter.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::domain::relay::QueuedEventMessage;
use crate::ports::{EventMessageHandler, EventQueue, QueueError};

/// In-memory event queue for testing.
///
/// Handlers registered via [`EventQueue::consume`] are invoked inline from
/// [`InMemoryEventQueue::publish`], so a test can publish a message and
/// assert on its effects without sleeping.
#[derive(Default)]
pub struct InMemoryEventQueue {
    handlers: RwLock<Vec<Arc<dyn EventMessageHandler>>>,
}

impl InMemoryEventQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a message to every registered handler.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn publish(&self, message: QueuedEventMessage) {
        let handlers: Vec<Arc<dyn EventMessageHandler>> = self
            .handlers
            .read()
            .expect("InMemoryEventQueue: handlers lock poisoned")
            .clone();
        for handler in handlers {
            handler.handle(message.clone()).await;
        }
    }

    /// Returns the number of registered handlers.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .expect("InMemoryEventQueue: handlers lock poisoned")
            .len()
    }
}

#[async_trait]
impl EventQueue for InMemoryEventQueue {
    async fn consume(&self, handler: Arc<dyn EventMessageHandler>) -> Result<(), QueueError> {
        self.handlers
            .write()
            .expect("InMemoryEventQueue: handlers write lock poisoned")
            .push(handler);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventMessageHandler for CountingHandler {
        async fn handle(&self, _message: QueuedEventMessage) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_message() -> QueuedEventMessage {
        QueuedEventMessage {
            account: Some("acme".to_string()),
            project: None,
            extra_keys: Vec::new(),
            event: Some("update".to_string()),
            data: Value::Null,
            emitter: None,
        }
    }

    #[tokio::test]
    async fn publish_invokes_registered_handler() {
        let queue = InMemoryEventQueue::new();
        let count = Arc::new(AtomicUsize::new(0));
        queue
            .consume(Arc::new(CountingHandler(count.clone())))
            .await
            .unwrap();

        queue.publish(test_message()).await;
        queue.publish(test_message()).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_without_handlers_is_noop() {
        let queue = InMemoryEventQueue::new();
        assert_eq!(queue.handler_count(), 0);
        queue.publish(test_message()).await;
    }

    #[tokio::test]
    async fn all_handlers_receive_each_message() {
        let queue = InMemoryEventQueue::new();
        let count = Arc::new(AtomicUsize::new(0));
        queue
            .consume(Arc::new(CountingHandler(count.clone())))
            .await
            .unwrap();
        queue
            .consume(Arc::new(CountingHandler(count.clone())))
            .await
            .unwrap();

        queue.publish(test_message()).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
