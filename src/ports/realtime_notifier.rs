//! Realtime fan-out port.
//!
//! Ingestion handlers push their results to connected operator clients
//! through this port. Delivery is best-effort and at most once per client:
//! a client that is slow, disconnected or not subscribed simply misses the
//! event, and must re-fetch state when it reconnects.
//!
//! # Rooms
//!
//! ```text
//! user:{accountId}   every connection of that account (joined on connect)
//! device:{deviceId}  connections that subscribed to one device
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::domain::chat::ChatMessage;
use crate::domain::device::Device;
use crate::domain::foundation::{ChatSessionId, DeviceId, UserId};

/// A subscription group of operator connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RealtimeRoom {
    User(UserId),
    Device(DeviceId),
}

impl fmt::Display for RealtimeRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealtimeRoom::User(id) => write!(f, "user:{}", id),
            RealtimeRoom::Device(id) => write!(f, "device:{}", id),
        }
    }
}

/// Payload of a `conversation:update` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdate {
    pub session_id: ChatSessionId,
    pub message: ChatMessage,
}

/// Payload of a `device:policy_ack` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAckNotice {
    pub device_id: DeviceId,
    pub payload: Value,
}

/// Events pushed to operators.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// `device:update` with the device as stored after a state or
    /// telemetry report.
    DeviceUpdate(Device),
    /// `conversation:update` for a newly stored chat message.
    ConversationUpdate(ConversationUpdate),
    /// `device:policy_ack` echoing the device's acknowledgment.
    PolicyAck(PolicyAckNotice),
}

impl RealtimeEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::DeviceUpdate(_) => "device:update",
            RealtimeEvent::ConversationUpdate(_) => "conversation:update",
            RealtimeEvent::PolicyAck(_) => "device:policy_ack",
        }
    }
}

#[async_trait]
pub trait RealtimeNotifier: Send + Sync {
    /// Delivers `event` to every connection in any of `rooms`.
    ///
    /// A connection that is in several of the rooms receives it once.
    async fn emit(&self, rooms: &[RealtimeRoom], event: RealtimeEvent);
}
