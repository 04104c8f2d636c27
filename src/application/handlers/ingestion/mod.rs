//! Ingestion handlers - one per inbound device suffix.
//!
//! Each handler persists the device-reported change, appends the raw payload
//! to the device event log, and fans the result out to realtime rooms.

mod chat_event;
mod device_state;
mod device_telemetry;
mod dispatcher;
mod policy_ack;

pub use chat_event::ChatEventHandler;
pub use device_state::DeviceStateHandler;
pub use device_telemetry::DeviceTelemetryHandler;
pub use dispatcher::{DispatchOutcome, IngestionDispatcher, IngestionPorts, RetryPolicy};
pub use policy_ack::PolicyAckHandler;

use crate::domain::device::Device;
use crate::ports::RealtimeRoom;

/// Result of a handler run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stored and fanned out.
    Applied,
    /// Older than the stored state; logged only.
    Stale,
    /// Refused after logging (e.g. an ack for a version never issued).
    Rejected,
}

/// Rooms that see updates about `device`: its owner's and its own.
pub(crate) fn device_rooms(device: &Device) -> [RealtimeRoom; 2] {
    [
        RealtimeRoom::User(device.owner_id.clone()),
        RealtimeRoom::Device(device.id.clone()),
    ]
}
