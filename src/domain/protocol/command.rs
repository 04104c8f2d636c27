//! Commands published to a device on `cmd`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::CommandId;

/// Closed set of commands a device understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Ping,
    Say,
    Reboot,
    OtaCheck,
}

/// `{id, type, args}` as the device receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub id: CommandId,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub args: Map<String, Value>,
}

impl DeviceCommand {
    /// A new command with a fresh id; missing args become `{}`.
    pub fn new(command_type: CommandType, args: Option<Map<String, Value>>) -> Self {
        Self {
            id: CommandId::new(),
            command_type,
            args: args.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serializes_wire_shape() {
        let cmd = DeviceCommand::new(CommandType::OtaCheck, None);
        let json = serde_json::to_value(&cmd).unwrap();

        assert_eq!(json["type"], "ota_check");
        assert_eq!(json["args"], serde_json::json!({}));
        assert_eq!(json["id"], cmd.id.to_string());
    }

    #[test]
    fn command_type_rejects_unknown() {
        assert!(serde_json::from_str::<CommandType>("\"self_destruct\"").is_err());
        assert_eq!(
            serde_json::from_str::<CommandType>("\"say\"").unwrap(),
            CommandType::Say
        );
    }
}
