//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `TOYLINK` prefix and
//! nested values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use toylink::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod ingestion;
mod mqtt;
mod server;
mod signing;

pub use auth::{AuthConfig, DEVELOPMENT_JWT_SECRET};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ingestion::IngestionConfig;
pub use mqtt::{BrokerAddress, EmbeddedBroker, MqttConfig, DEFAULT_MQTT_PORT};
pub use server::{Environment, LogFormat, ServerConfig};
pub use signing::SigningConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// development setup: in-memory store, embedded broker, generated signing key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Device broker configuration
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Operator token configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Policy signing key material
    #[serde(default)]
    pub signing: SigningConfig,

    /// Retry behavior for inbound device messages
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TOYLINK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TOYLINK__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TOYLINK__MQTT__BROKER_URL=...` -> `mqtt.broker_url = ...`
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TOYLINK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// In production, an ephemeral signing key or the development JWT secret
    /// is a configuration error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.mqtt.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.signing.validate(&self.server.environment)?;
        self.ingestion.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
