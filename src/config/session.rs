//! Session store configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Session store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie clients present at connect
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Key prefix session records are stored under in Redis
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl SessionConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cookie_name.is_empty() {
            return Err(ValidationError::MissingRequired("SESSION__COOKIE_NAME"));
        }
        if self.key_prefix.is_empty() {
            return Err(ValidationError::MissingRequired("SESSION__KEY_PREFIX"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_cookie_name() -> String {
    "connect.sid".to_string()
}

fn default_key_prefix() -> String {
    "sess:".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "connect.sid");
        assert_eq!(config.key_prefix, "sess:");
    }

    #[test]
    fn test_validation_rejects_empty_cookie_name() {
        let config = SessionConfig {
            cookie_name: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_accepts_defaults() {
        assert!(SessionConfig::default().validate().is_ok());
    }
}
