//! Device repository port.
//!
//! Devices are created by pairing (outside this service) and afterwards only
//! mutated field by field from what the device reports about itself. Each
//! update method touches exactly the fields its message kind owns, so two
//! kinds of message arriving close together never overwrite each other.
//!
//! # Staleness
//!
//! `apply_state` and `apply_telemetry` compare the report's device-side time
//! with the stored one inside the store, atomically with the write. An older
//! report is refused with `Ok(None)` and nothing is written.

use async_trait::async_trait;

use crate::domain::device::{Device, DeviceStateUpdate, TelemetryUpdate};
use crate::domain::foundation::{ChildId, DeviceId, DomainError};

/// Persistence for `Device` records.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Find a device by id. Returns `None` if it was never paired.
    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<Device>, DomainError>;

    /// Devices linked to a child, oldest pairing first.
    async fn list_for_child(&self, child_id: &ChildId) -> Result<Vec<Device>, DomainError>;

    /// Insert or fully replace a device (pairing and seeding).
    async fn save(&self, device: &Device) -> Result<(), DomainError>;

    /// Sets status, firmware, capability flag, battery, last seen and
    /// (when reported) the linked child.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound` if the device was never paired
    /// - `DatabaseError` on persistence failure
    async fn apply_state(
        &self,
        id: &DeviceId,
        update: &DeviceStateUpdate,
    ) -> Result<Option<Device>, DomainError>;

    /// Replaces the cumulative counters.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound` if the device was never paired
    /// - `DatabaseError` on persistence failure
    async fn apply_telemetry(
        &self,
        id: &DeviceId,
        update: &TelemetryUpdate,
    ) -> Result<Option<Device>, DomainError>;

    /// Stores `max(stored, version)` as the confirmed policy version and
    /// returns the device afterwards.
    async fn confirm_policy_version(&self, id: &DeviceId, version: u32) -> Result<Device, DomainError>;
}
