//! Append-only device event log port.
//!
//! One row per accepted inbound message, duplicates included. Rows are never
//! updated or deleted.

use async_trait::async_trait;

use crate::domain::device::DeviceEvent;
use crate::domain::foundation::{DeviceId, DomainError};

#[async_trait]
pub trait DeviceEventLog: Send + Sync {
    /// Appends one event.
    async fn append(&self, event: &DeviceEvent) -> Result<(), DomainError>;

    /// The most recent `limit` events for a device, newest first.
    async fn recent_for_device(
        &self,
        device_id: &DeviceId,
        limit: u32,
    ) -> Result<Vec<DeviceEvent>, DomainError>;
}
