//! Event queue configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Event queue configuration
///
/// The channel is required with no default: a relay without a queue must
/// not come up at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Pub/sub channel the backend publishes event messages on
    #[serde(default)]
    pub channel: String,
}

impl QueueConfig {
    /// Validate queue configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel.is_empty() {
            return Err(ValidationError::MissingRequired("QUEUE__CHANNEL"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_channel() {
        let config = QueueConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_channel() {
        let config = QueueConfig {
            channel: "chat.events".to_string(),
        };
        assert!(config.validate().is_ok());
    }
}
