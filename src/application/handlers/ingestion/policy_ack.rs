//! PolicyAckHandler - records a device's policy acknowledgment.

use serde_json::Value;
use std::sync::Arc;

use super::{device_rooms, IngestOutcome};
use crate::domain::device::{DeviceEvent, DeviceEventType};
use crate::domain::foundation::{ChildId, DeviceId, DomainError, ErrorCode};
use crate::domain::protocol::PolicyAck;
use crate::ports::{
    DeviceEventLog, DeviceRepository, PolicyAckNotice, RealtimeEvent, RealtimeNotifier,
    SafetyPolicyRepository,
};

/// Advances the confirmed policy version on successful acks.
///
/// The confirmed version never moves backwards, and a version above the
/// child's `cloud_version` is refused: the cloud never issued it.
pub struct PolicyAckHandler {
    devices: Arc<dyn DeviceRepository>,
    policies: Arc<dyn SafetyPolicyRepository>,
    event_log: Arc<dyn DeviceEventLog>,
    notifier: Arc<dyn RealtimeNotifier>,
}

impl PolicyAckHandler {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        policies: Arc<dyn SafetyPolicyRepository>,
        event_log: Arc<dyn DeviceEventLog>,
        notifier: Arc<dyn RealtimeNotifier>,
    ) -> Self {
        Self {
            devices,
            policies,
            event_log,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        device_id: &DeviceId,
        ack: &PolicyAck,
        raw: &Value,
    ) -> Result<IngestOutcome, DomainError> {
        let device = self.devices.find_by_id(device_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::DeviceNotFound, format!("Device {} not found", device_id))
                .with_detail("device_id", device_id.as_str())
        })?;

        let outcome = if !ack.ok {
            tracing::warn!(
                device_id = %device_id,
                policy_version = ack.policy_version,
                "Device failed to apply policy"
            );
            IngestOutcome::Applied
        } else {
            self.confirm(&device.id, device.child_id.as_ref(), ack.policy_version)
                .await?
        };

        self.event_log
            .append(&DeviceEvent::new(
                device_id.clone(),
                DeviceEventType::PolicyAck,
                raw.clone(),
            ))
            .await?;

        if outcome == IngestOutcome::Rejected {
            return Ok(outcome);
        }

        self.notifier
            .emit(
                &device_rooms(&device),
                RealtimeEvent::PolicyAck(PolicyAckNotice {
                    device_id: device_id.clone(),
                    payload: raw.clone(),
                }),
            )
            .await;

        tracing::info!(
            device_id = %device_id,
            policy_version = ack.policy_version,
            ok = ack.ok,
            "Policy ack received"
        );
        Ok(outcome)
    }

    async fn confirm(
        &self,
        device_id: &DeviceId,
        child_id: Option<&ChildId>,
        version: u32,
    ) -> Result<IngestOutcome, DomainError> {
        if let Some(child_id) = child_id {
            if let Some(policy) = self.policies.find_by_child(child_id).await? {
                if version > policy.cloud_version {
                    tracing::warn!(
                        device_id = %device_id,
                        child_id = %child_id,
                        policy_version = version,
                        cloud_version = policy.cloud_version,
                        "Rejecting ack for a policy version that was never issued"
                    );
                    return Ok(IngestOutcome::Rejected);
                }
                self.policies.record_device_version(child_id, version).await?;
            }
        }

        self.devices.confirm_policy_version(device_id, version).await?;
        Ok(IngestOutcome::Applied)
    }
}
