//! Append-only device event log entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DeviceId, EventId, Timestamp, ValidationError};

/// Kind of inbound message an event row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEventType {
    State,
    Telemetry,
    Chat,
    PolicyAck,
}

impl DeviceEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceEventType::State => "state",
            DeviceEventType::Telemetry => "telemetry",
            DeviceEventType::Chat => "chat",
            DeviceEventType::PolicyAck => "policy_ack",
        }
    }
}

impl fmt::Display for DeviceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceEventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "state" => Ok(DeviceEventType::State),
            "telemetry" => Ok(DeviceEventType::Telemetry),
            "chat" => Ok(DeviceEventType::Chat),
            "policy_ack" => Ok(DeviceEventType::PolicyAck),
            other => Err(ValidationError::invalid_format(
                "type",
                format!("unknown device event type '{}'", other),
            )),
        }
    }
}

/// One accepted inbound message, stored verbatim.
///
/// Rows are never updated or deleted. Duplicated deliveries produce
/// duplicated rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEvent {
    pub id: EventId,
    pub device_id: DeviceId,
    #[serde(rename = "type")]
    pub event_type: DeviceEventType,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

impl DeviceEvent {
    pub fn new(device_id: DeviceId, event_type: DeviceEventType, payload: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            device_id,
            event_type,
            payload,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_through_str() {
        for t in [
            DeviceEventType::State,
            DeviceEventType::Telemetry,
            DeviceEventType::Chat,
            DeviceEventType::PolicyAck,
        ] {
            assert_eq!(t.as_str().parse::<DeviceEventType>().unwrap(), t);
        }
    }

    #[test]
    fn event_serializes_type_field() {
        let event = DeviceEvent::new(
            DeviceId::new("toy-1").unwrap(),
            DeviceEventType::PolicyAck,
            serde_json::json!({"ok": true}),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "policy_ack");
        assert_eq!(json["deviceId"], "toy-1");
    }
}
