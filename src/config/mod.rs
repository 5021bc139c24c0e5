//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_RELAY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Relay listening on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod queue;
mod redis;
mod server;
mod session;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use queue::QueueConfig;
pub use self::redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the chat relay.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, WebSocket path)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL permissions backend)
    pub database: DatabaseConfig,

    /// Redis configuration (session store and event queue)
    pub redis: RedisConfig,

    /// Event queue configuration (channel name)
    #[serde(default)]
    pub queue: QueueConfig,

    /// Session store configuration (cookie name, key prefix)
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHAT_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_RELAY__QUEUE__CHANNEL=...` -> `queue.channel = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    /// An unset queue channel is an error here: the relay refuses to start
    /// without a queue to consume.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.queue.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
