//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),

    #[error("Invalid MQTT topic namespace")]
    InvalidTopicNamespace,

    #[error("MQTT keep-alive must be at least 5 seconds")]
    InvalidKeepAlive,

    #[error("JWT secret must be set to a non-default value in production")]
    InsecureJwtSecret,

    #[error("Signing key material is required in production")]
    SigningKeyRequired,

    #[error("A signing public key was given without its secret key")]
    PublicKeyWithoutSecret,

    #[error("Ingestion max_attempts must be at least 1")]
    InvalidRetryAttempts,
}
