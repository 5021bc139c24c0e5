//! Redis pub/sub implementation of the event queue.
//!
//! The backend publishes JSON-encoded [`QueuedEventMessage`]s on a single
//! channel. Subscription failure is fatal to startup; once subscribed, the
//! consumer task never gives up on the relay - undecodable payloads are
//! dropped and logged.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use crate::domain::relay::QueuedEventMessage;
use crate::ports::{EventMessageHandler, EventQueue, QueueError};

/// Event queue consumer backed by a Redis pub/sub channel.
pub struct RedisEventQueue {
    client: redis::Client,
    channel: String,
}

impl RedisEventQueue {
    /// Create a consumer for `channel` on the given Redis client.
    pub fn new(client: redis::Client, channel: impl Into<String>) -> Self {
        Self {
            client,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl EventQueue for RedisEventQueue {
    async fn consume(&self, handler: Arc<dyn EventMessageHandler>) -> Result<(), QueueError> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))?;

        let mut pubsub = conn.into_pubsub();
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        let channel = self.channel.clone();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(channel = %channel, error = %e, "unreadable queue payload");
                        continue;
                    }
                };
                match serde_json::from_str::<QueuedEventMessage>(&payload) {
                    Ok(message) => handler.handle(message).await,
                    Err(e) => {
                        tracing::debug!(
                            channel = %channel,
                            error = %e,
                            "dropping undecodable queue message"
                        );
                    }
                }
            }
            tracing::warn!(channel = %channel, "event queue subscription ended");
        });

        tracing::info!(channel = %self.channel, "consuming event queue");
        Ok(())
    }
}
