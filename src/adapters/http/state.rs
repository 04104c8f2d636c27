//! Shared state for the operator HTTP API.

use std::sync::Arc;

use crate::application::handlers::{
    GetDeviceHealthHandler, GetEffectivePolicyHandler, GetGuardrailsHandler, PairDeviceHandler,
    PolicyCompiler, PushPolicyHandler, SendCommandHandler, UpdateGuardrailsHandler,
};
use crate::ports::{
    AccessChecker, DeviceEventLog, DeviceRepository, DeviceTransport, PolicySigner,
    SafetyPolicyRepository,
};

/// Shared application state containing all dependencies.
///
/// Cloned for each request; handlers are built on demand from the ports.
#[derive(Clone)]
pub struct AppState {
    pub devices: Arc<dyn DeviceRepository>,
    pub policies: Arc<dyn SafetyPolicyRepository>,
    pub event_log: Arc<dyn DeviceEventLog>,
    pub access: Arc<dyn AccessChecker>,
    pub transport: Arc<dyn DeviceTransport>,
    pub signer: Arc<dyn PolicySigner>,
}

impl AppState {
    fn compiler(&self) -> PolicyCompiler {
        PolicyCompiler::new(self.signer.clone())
    }

    pub fn get_guardrails_handler(&self) -> GetGuardrailsHandler {
        GetGuardrailsHandler::new(self.access.clone(), self.policies.clone())
    }

    pub fn update_guardrails_handler(&self) -> UpdateGuardrailsHandler {
        UpdateGuardrailsHandler::new(self.access.clone(), self.policies.clone())
    }

    pub fn effective_policy_handler(&self) -> GetEffectivePolicyHandler {
        GetEffectivePolicyHandler::new(
            self.access.clone(),
            self.policies.clone(),
            self.devices.clone(),
            self.compiler(),
        )
    }

    pub fn push_policy_handler(&self) -> PushPolicyHandler {
        PushPolicyHandler::new(
            self.devices.clone(),
            self.policies.clone(),
            self.transport.clone(),
            self.compiler(),
        )
    }

    pub fn send_command_handler(&self) -> SendCommandHandler {
        SendCommandHandler::new(self.devices.clone(), self.transport.clone())
    }

    pub fn device_health_handler(&self) -> GetDeviceHealthHandler {
        GetDeviceHealthHandler::new(self.devices.clone(), self.event_log.clone())
    }

    pub fn pair_device_handler(&self) -> PairDeviceHandler {
        PairDeviceHandler::new(self.devices.clone(), self.access.clone())
    }
}
