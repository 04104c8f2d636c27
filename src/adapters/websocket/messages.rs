//! WebSocket message types for the realtime operator channel.
//!
//! Defines the protocol between server and connected operator clients:
//! - Server → Client: connection status, device and conversation updates,
//!   subscription acknowledgments, errors, pongs
//! - Client → Server: device room subscriptions, pings

use serde::{Deserialize, Serialize};

use crate::domain::device::Device;
use crate::domain::foundation::Timestamp;
use crate::ports::{ConversationUpdate, PolicyAckNotice, RealtimeEvent};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
///
/// Frames are `{"type": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Connection established and joined to the account room.
    #[serde(rename = "connected")]
    Connected(ConnectedMessage),

    #[serde(rename = "device:update")]
    DeviceUpdate(Device),

    #[serde(rename = "conversation:update")]
    ConversationUpdate(ConversationUpdate),

    #[serde(rename = "device:policy_ack")]
    PolicyAck(PolicyAckNotice),

    #[serde(rename = "subscribed")]
    Subscribed(SubscriptionMessage),

    #[serde(rename = "unsubscribed")]
    Unsubscribed(SubscriptionMessage),

    #[serde(rename = "pong")]
    Pong(PongMessage),

    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl From<RealtimeEvent> for ServerMessage {
    fn from(event: RealtimeEvent) -> Self {
        match event {
            RealtimeEvent::DeviceUpdate(device) => ServerMessage::DeviceUpdate(device),
            RealtimeEvent::ConversationUpdate(update) => ServerMessage::ConversationUpdate(update),
            RealtimeEvent::PolicyAck(notice) => ServerMessage::PolicyAck(notice),
        }
    }
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.to_string(),
            message: message.into(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }
}

/// Sent once after the upgrade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub client_id: String,
    pub user_id: String,
    pub timestamp: String,
}

/// Acknowledges a device room join or leave.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMessage {
    pub device_id: String,
}

/// Error message sent to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join the room of one of the caller's devices.
    #[serde(rename = "subscribe:device", rename_all = "camelCase")]
    SubscribeDevice { device_id: String },

    #[serde(rename = "unsubscribe:device", rename_all = "camelCase")]
    UnsubscribeDevice { device_id: String },

    /// Heartbeat request.
    #[serde(rename = "ping")]
    Ping,
}
