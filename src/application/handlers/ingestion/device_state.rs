//! DeviceStateHandler - applies `state` reports to the device record.

use serde_json::Value;
use std::sync::Arc;

use super::{device_rooms, IngestOutcome};
use crate::domain::device::{DeviceEvent, DeviceEventType, DeviceStateUpdate};
use crate::domain::foundation::{DeviceId, DomainError};
use crate::ports::{DeviceEventLog, DeviceRepository, RealtimeEvent, RealtimeNotifier};

pub struct DeviceStateHandler {
    devices: Arc<dyn DeviceRepository>,
    event_log: Arc<dyn DeviceEventLog>,
    notifier: Arc<dyn RealtimeNotifier>,
}

impl DeviceStateHandler {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        event_log: Arc<dyn DeviceEventLog>,
        notifier: Arc<dyn RealtimeNotifier>,
    ) -> Self {
        Self {
            devices,
            event_log,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        device_id: &DeviceId,
        update: &DeviceStateUpdate,
        raw: &Value,
    ) -> Result<IngestOutcome, DomainError> {
        // 1. Persist, unless an equal or newer report is already stored
        let applied = self.devices.apply_state(device_id, update).await?;

        // 2. Record the report either way
        self.event_log
            .append(&DeviceEvent::new(
                device_id.clone(),
                DeviceEventType::State,
                raw.clone(),
            ))
            .await?;

        // 3. Fan out fresh state only
        let Some(device) = applied else {
            tracing::debug!(device_id = %device_id, "Ignoring stale state report");
            return Ok(IngestOutcome::Stale);
        };

        self.notifier
            .emit(&device_rooms(&device), RealtimeEvent::DeviceUpdate(device))
            .await;

        tracing::info!(device_id = %device_id, status = %update.status, "Device state updated");
        Ok(IngestOutcome::Applied)
    }
}
