//! HTTP DTOs for device endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::protocol::{CommandType, DeviceCommand};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairDeviceRequest {
    pub device_id: String,
    #[serde(default)]
    pub child_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendCommandRequest {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default)]
    pub args: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendCommandResponse {
    pub success: bool,
    pub command: DeviceCommand,
}
