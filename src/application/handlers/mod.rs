//! Command, query and ingestion handlers.
//!
//! - `ingestion` - inbound device messages, one handler per suffix
//! - `policy` - guardrail edits and signed policy distribution
//! - `device` - operator actions on a paired device

pub mod device;
pub mod ingestion;
pub mod policy;

pub use device::{
    CommandError, DeviceHealth, GetDeviceHealthHandler, GetDeviceHealthQuery, PairDeviceCommand,
    PairDeviceHandler, SendCommandCommand, SendCommandHandler,
};
pub use ingestion::{
    DispatchOutcome, IngestOutcome, IngestionDispatcher, IngestionPorts, RetryPolicy,
};
pub use policy::{
    GetEffectivePolicyHandler, GetEffectivePolicyQuery, GetGuardrailsHandler, GetGuardrailsQuery,
    PolicyCompiler, PolicyError, PushPolicyCommand, PushPolicyHandler, PushPolicyResult,
    UpdateGuardrailsCommand, UpdateGuardrailsHandler,
};
