//! PushPolicyHandler - signs a device's policy and publishes it.

use std::sync::Arc;

use super::{PolicyCompiler, PolicyError};
use crate::domain::foundation::{DeviceId, UserId};
use crate::domain::policy::SignedPolicyDocument;
use crate::domain::protocol::TopicSuffix;
use crate::ports::{DeviceRepository, DeviceTransport, SafetyPolicyRepository, SignerError};

#[derive(Debug, Clone)]
pub struct PushPolicyCommand {
    pub user_id: UserId,
    pub device_id: DeviceId,
}

#[derive(Debug, Clone)]
pub struct PushPolicyResult {
    pub policy: SignedPolicyDocument,
}

pub struct PushPolicyHandler {
    devices: Arc<dyn DeviceRepository>,
    policies: Arc<dyn SafetyPolicyRepository>,
    transport: Arc<dyn DeviceTransport>,
    compiler: PolicyCompiler,
}

impl PushPolicyHandler {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        policies: Arc<dyn SafetyPolicyRepository>,
        transport: Arc<dyn DeviceTransport>,
        compiler: PolicyCompiler,
    ) -> Self {
        Self {
            devices,
            policies,
            transport,
            compiler,
        }
    }

    pub async fn handle(&self, cmd: PushPolicyCommand) -> Result<PushPolicyResult, PolicyError> {
        // 1. Only the owner sees the device at all
        let device = self
            .devices
            .find_by_id(&cmd.device_id)
            .await?
            .filter(|d| d.owner_id == cmd.user_id)
            .ok_or_else(|| PolicyError::DeviceNotFound(cmd.device_id.clone()))?;

        // 2. Resolve the stored policy of the linked child
        let child_id = device
            .child_id
            .clone()
            .ok_or_else(|| PolicyError::DeviceNotLinked(device.id.clone()))?;
        let policy = self
            .policies
            .find_by_child(&child_id)
            .await?
            .ok_or_else(|| PolicyError::PolicyNotFound(child_id.clone()))?;

        // 3. Compile, sign, publish
        let signed = self.compiler.compile(Some(&policy), &child_id, Some(&device.id))?;
        let payload = signed.to_value().map_err(SignerError::from)?;

        self.transport
            .publish(&device.id, TopicSuffix::PolicyApply, &payload)
            .await
            .map_err(PolicyError::Publish)?;

        tracing::info!(
            device_id = %device.id,
            child_id = %child_id,
            version = signed.document.version,
            "Policy pushed to device"
        );
        Ok(PushPolicyResult { policy: signed })
    }
}
