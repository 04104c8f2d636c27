//! DeviceTelemetryHandler - stores cumulative play counters.

use serde_json::Value;
use std::sync::Arc;

use super::{device_rooms, IngestOutcome};
use crate::domain::device::{DeviceEvent, DeviceEventType, TelemetryUpdate};
use crate::domain::foundation::{DeviceId, DomainError};
use crate::ports::{DeviceEventLog, DeviceRepository, RealtimeEvent, RealtimeNotifier};

/// Telemetry carries totals, not deltas: the last applied report wins.
pub struct DeviceTelemetryHandler {
    devices: Arc<dyn DeviceRepository>,
    event_log: Arc<dyn DeviceEventLog>,
    notifier: Arc<dyn RealtimeNotifier>,
}

impl DeviceTelemetryHandler {
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
        update: &TelemetryUpdate,
        raw: &Value,
    ) -> Result<IngestOutcome, DomainError> {
        let applied = self.devices.apply_telemetry(device_id, update).await?;

        self.event_log
            .append(&DeviceEvent::new(
                device_id.clone(),
                DeviceEventType::Telemetry,
                raw.clone(),
            ))
            .await?;

        let Some(device) = applied else {
            tracing::debug!(device_id = %device_id, "Ignoring stale telemetry report");
            return Ok(IngestOutcome::Stale);
        };

        self.notifier
            .emit(&device_rooms(&device), RealtimeEvent::DeviceUpdate(device))
            .await;

        tracing::info!(
            device_id = %device_id,
            play_time_min = update.play_time_min,
            adventures_count = update.adventures_count,
            "Device telemetry updated"
        );
        Ok(IngestOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryStore, RecordingNotifier};
    use crate::domain::device::Device;
    use crate::domain::foundation::{Timestamp, UserId};
    use serde_json::json;

    fn device_id() -> DeviceId {
        DeviceId::new("toy-1").unwrap()
    }

    fn totals(play: u32, adventures: u32, ts: Option<&str>) -> TelemetryUpdate {
        TelemetryUpdate {
            play_time_min: play,
            adventures_count: adventures,
            reported_at: ts.map(|s| Timestamp::parse_rfc3339(s).unwrap()),
        }
    }

    async fn setup() -> (DeviceTelemetryHandler, Arc<InMemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(InMemoryStore::new());
        store
            .save(&Device::paired(device_id(), UserId::new("parent-1").unwrap(), None))
            .await
            .unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let handler = DeviceTelemetryHandler::new(store.clone(), store.clone(), notifier.clone());
        (handler, store, notifier)
    }

    #[tokio::test]
    async fn last_report_wins() {
        let (handler, store, notifier) = setup().await;

        handler.handle(&device_id(), &totals(10, 1, None), &json!({})).await.unwrap();
        handler.handle(&device_id(), &totals(25, 3, None), &json!({})).await.unwrap();

        let device = store.find_by_id(&device_id()).await.unwrap().unwrap();
        assert_eq!(device.play_time_min, 25);
        assert_eq!(device.adventures_count, 3);
        assert_eq!(store.events_for(&device_id()).await.len(), 2);
        assert_eq!(notifier.named("device:update").len(), 2);
    }

    #[tokio::test]
    async fn older_timestamped_report_does_not_regress_counters() {
        let (handler, store, notifier) = setup().await;

        handler
            .handle(&device_id(), &totals(30, 4, Some("2024-01-02T00:00:00Z")), &json!({}))
            .await
            .unwrap();
        let outcome = handler
            .handle(&device_id(), &totals(12, 1, Some("2024-01-01T00:00:00Z")), &json!({}))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Stale);
        let device = store.find_by_id(&device_id()).await.unwrap().unwrap();
        assert_eq!(device.play_time_min, 30);
        assert_eq!(store.events_for(&device_id()).await.len(), 2);
        assert_eq!(notifier.emitted().len(), 1);
    }
}
