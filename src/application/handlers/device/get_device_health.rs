//! GetDeviceHealthHandler - a device and its most recent events.

use serde::Serialize;
use std::sync::Arc;

use super::CommandError;
use crate::domain::device::{Device, DeviceEvent};
use crate::domain::foundation::{DeviceId, UserId};
use crate::ports::{DeviceEventLog, DeviceRepository};

/// Number of events returned with the device.
pub const RECENT_EVENT_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub struct GetDeviceHealthQuery {
    pub user_id: UserId,
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealth {
    pub device: Device,
    /// Newest first.
    pub recent_events: Vec<DeviceEvent>,
}

pub struct GetDeviceHealthHandler {
    devices: Arc<dyn DeviceRepository>,
    event_log: Arc<dyn DeviceEventLog>,
}

impl GetDeviceHealthHandler {
    pub fn new(devices: Arc<dyn DeviceRepository>, event_log: Arc<dyn DeviceEventLog>) -> Self {
        Self { devices, event_log }
    }

    pub async fn handle(&self, query: GetDeviceHealthQuery) -> Result<DeviceHealth, CommandError> {
        let device = self
            .devices
            .find_by_id(&query.device_id)
            .await?
            .filter(|d| d.owner_id == query.user_id)
            .ok_or_else(|| CommandError::DeviceNotFound(query.device_id.clone()))?;

        let recent_events = self
            .event_log
            .recent_for_device(&device.id, RECENT_EVENT_LIMIT)
            .await?;

        Ok(DeviceHealth {
            device,
            recent_events,
        })
    }
}
