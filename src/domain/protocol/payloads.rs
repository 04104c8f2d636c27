//! Inbound device payloads.
//!
//! Every message kind is parsed into its own wire struct and then validated
//! into the typed value the ingestion handlers consume. Nothing reaches a
//! handler without passing both steps.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::topics::TopicSuffix;
use crate::domain::chat::{ChatMessage, ChatRole};
use crate::domain::device::{DeviceEventType, DeviceStateUpdate, DeviceStatus, TelemetryUpdate};
use crate::domain::foundation::{ChatSessionId, ChildId, Timestamp, ValidationError};

/// Why an inbound payload was refused.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("payload does not match the {kind} schema: {source}")]
    Schema {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("devices do not publish on '{0}'")]
    NotInbound(TopicSuffix),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateWire {
    status: String,
    fw_version: String,
    tpu_present: bool,
    battery_pct: i64,
    #[serde(default)]
    child_id: Option<String>,
    last_seen: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryWire {
    play_time_min: u32,
    adventures_count: u32,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatWire {
    session_id: String,
    child_id: String,
    role: String,
    content: String,
    ts: String,
    #[serde(default)]
    tokens: Option<u32>,
    #[serde(default)]
    topic_tags: Option<Vec<String>>,
    #[serde(default)]
    safety_hits: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyAckWire {
    policy_version: u32,
    ok: bool,
    applied_at: String,
}

/// A validated `events/chat` message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub session_id: ChatSessionId,
    pub child_id: ChildId,
    pub role: ChatRole,
    pub content: String,
    pub ts: Timestamp,
    /// Reported count, or an estimate when the device sent none.
    pub tokens: u32,
    pub topic_tags: Option<Vec<String>>,
    pub safety_hits: Option<Vec<String>>,
}

/// A validated `policy/ack` message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyAck {
    pub policy_version: u32,
    pub ok: bool,
    pub applied_at: Timestamp,
}

/// One inbound device message, by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    State(DeviceStateUpdate),
    Telemetry(TelemetryUpdate),
    Chat(ChatEvent),
    PolicyAck(PolicyAck),
}

/// A validated message together with the JSON it was decoded from.
///
/// The raw value is what the event log stores.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub message: InboundMessage,
    pub raw: Value,
}

impl InboundMessage {
    /// Parses and validates the payload published on `suffix`.
    pub fn decode(suffix: TopicSuffix, bytes: &[u8]) -> Result<DecodedPayload, PayloadError> {
        let raw: Value = serde_json::from_slice(bytes).map_err(PayloadError::NotJson)?;

        let message = match suffix {
            TopicSuffix::State => InboundMessage::State(parse_state(wire(&raw, "state")?)?),
            TopicSuffix::Telemetry => {
                InboundMessage::Telemetry(parse_telemetry(wire(&raw, "telemetry")?)?)
            }
            TopicSuffix::EventsChat => InboundMessage::Chat(parse_chat(wire(&raw, "chat")?)?),
            TopicSuffix::PolicyAck => {
                InboundMessage::PolicyAck(parse_policy_ack(wire(&raw, "policy_ack")?)?)
            }
            other => return Err(PayloadError::NotInbound(other)),
        };

        Ok(DecodedPayload { message, raw })
    }

    /// The event-log type this message is recorded under.
    pub fn event_type(&self) -> DeviceEventType {
        match self {
            InboundMessage::State(_) => DeviceEventType::State,
            InboundMessage::Telemetry(_) => DeviceEventType::Telemetry,
            InboundMessage::Chat(_) => DeviceEventType::Chat,
            InboundMessage::PolicyAck(_) => DeviceEventType::PolicyAck,
        }
    }
}

fn wire<T: serde::de::DeserializeOwned>(raw: &Value, kind: &'static str) -> Result<T, PayloadError> {
    T::deserialize(raw).map_err(|source| PayloadError::Schema { kind, source })
}

fn parse_timestamp(field: &str, value: &str) -> Result<Timestamp, ValidationError> {
    Timestamp::parse_rfc3339(value)
        .map_err(|e| ValidationError::invalid_format(field, e.to_string()))
}

fn parse_state(w: StateWire) -> Result<DeviceStateUpdate, ValidationError> {
    let status: DeviceStatus = w.status.parse()?;
    if !(0..=100).contains(&w.battery_pct) {
        return Err(ValidationError::out_of_range("batteryPct", 0, 100, w.battery_pct));
    }
    if w.fw_version.trim().is_empty() {
        return Err(ValidationError::empty_field("fwVersion"));
    }
    let child_id = w.child_id.map(ChildId::new).transpose()?;

    Ok(DeviceStateUpdate {
        status,
        firmware_version: w.fw_version,
        tpu_present: w.tpu_present,
        battery_pct: w.battery_pct as u8,
        last_seen: parse_timestamp("lastSeen", &w.last_seen)?,
        child_id,
    })
}

fn parse_telemetry(w: TelemetryWire) -> Result<TelemetryUpdate, ValidationError> {
    let reported_at = w
        .ts
        .as_deref()
        .map(|ts| parse_timestamp("ts", ts))
        .transpose()?;

    Ok(TelemetryUpdate {
        play_time_min: w.play_time_min,
        adventures_count: w.adventures_count,
        reported_at,
    })
}

fn parse_chat(w: ChatWire) -> Result<ChatEvent, ValidationError> {
    if w.content.is_empty() {
        return Err(ValidationError::empty_field("content"));
    }
    let tokens = w
        .tokens
        .unwrap_or_else(|| ChatMessage::estimate_tokens(&w.content));

    Ok(ChatEvent {
        session_id: ChatSessionId::new(w.session_id)?,
        child_id: ChildId::new(w.child_id)?,
        role: w.role.parse()?,
        ts: parse_timestamp("ts", &w.ts)?,
        tokens,
        content: w.content,
        topic_tags: w.topic_tags,
        safety_hits: w.safety_hits,
    })
}

fn parse_policy_ack(w: PolicyAckWire) -> Result<PolicyAck, ValidationError> {
    Ok(PolicyAck {
        policy_version: w.policy_version,
        ok: w.ok,
        applied_at: parse_timestamp("appliedAt", &w.applied_at)?,
    })
}
