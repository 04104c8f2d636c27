//! Outbound device messaging port.
//!
//! Publishing is at-least-once. A failed publish is reported to the caller
//! and never retried here; the caller decides whether to try again.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::{DeviceId, DomainError, ErrorCode};
use crate::domain::protocol::TopicSuffix;

/// Why a publish did not happen.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected to the broker")]
    NotConnected,

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broker client error: {0}")]
    Client(String),
}

impl From<TransportError> for DomainError {
    fn from(err: TransportError) -> Self {
        DomainError::new(ErrorCode::TransportError, err.to_string())
    }
}

#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Publishes `payload` as JSON on the device's `suffix` topic.
    async fn publish(
        &self,
        device_id: &DeviceId,
        suffix: TopicSuffix,
        payload: &Value,
    ) -> Result<(), TransportError>;

    /// Whether a broker session is currently established.
    fn is_connected(&self) -> bool;
}
