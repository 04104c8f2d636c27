//! SendCommandHandler - publishes an operator command on `cmd`.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::CommandError;
use crate::domain::foundation::{DeviceId, UserId};
use crate::domain::protocol::{CommandType, DeviceCommand, TopicSuffix};
use crate::ports::{DeviceRepository, DeviceTransport, TransportError};

#[derive(Debug, Clone)]
pub struct SendCommandCommand {
    pub user_id: UserId,
    pub device_id: DeviceId,
    pub command_type: CommandType,
    pub args: Option<Map<String, Value>>,
}

pub struct SendCommandHandler {
    devices: Arc<dyn DeviceRepository>,
    transport: Arc<dyn DeviceTransport>,
}

impl SendCommandHandler {
    pub fn new(devices: Arc<dyn DeviceRepository>, transport: Arc<dyn DeviceTransport>) -> Self {
        Self { devices, transport }
    }

    /// Returns the command as published. Publishing is not retried.
    pub async fn handle(&self, cmd: SendCommandCommand) -> Result<DeviceCommand, CommandError> {
        let device = self
            .devices
            .find_by_id(&cmd.device_id)
            .await?
            .filter(|d| d.owner_id == cmd.user_id)
            .ok_or_else(|| CommandError::DeviceNotFound(cmd.device_id.clone()))?;

        let command = DeviceCommand::new(cmd.command_type, cmd.args);
        let payload = serde_json::to_value(&command).map_err(TransportError::from)?;

        self.transport
            .publish(&device.id, TopicSuffix::Command, &payload)
            .await?;

        tracing::info!(device_id = %device.id, command_id = %command.id, "Command sent");
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryStore, RecordingTransport};
    use crate::domain::device::Device;

    fn device_id() -> DeviceId {
        DeviceId::new("toy-1").unwrap()
    }

    async fn setup() -> (SendCommandHandler, Arc<RecordingTransport>) {
        let store = Arc::new(InMemoryStore::new());
        store
            .save(&Device::paired(device_id(), UserId::new("parent-1").unwrap(), None))
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::new());
        (SendCommandHandler::new(store, transport.clone()), transport)
    }

    fn say(user: &str) -> SendCommandCommand {
        let mut args = Map::new();
        args.insert("text".to_string(), Value::from("bedtime!"));
        SendCommandCommand {
            user_id: UserId::new(user).unwrap(),
            device_id: device_id(),
            command_type: CommandType::Say,
            args: Some(args),
        }
    }

    #[tokio::test]
    async fn publishes_id_type_and_args() {
        let (handler, transport) = setup().await;

        let command = handler.handle(say("parent-1")).await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].suffix, TopicSuffix::Command);
        assert_eq!(published[0].payload["type"], "say");
        assert_eq!(published[0].payload["args"]["text"], "bedtime!");
        assert_eq!(published[0].payload["id"], command.id.to_string());
    }

    #[tokio::test]
    async fn other_accounts_device_is_not_found() {
        let (handler, transport) = setup().await;

        let result = handler.handle(say("parent-2")).await;

        assert!(matches!(result, Err(CommandError::DeviceNotFound(_))));
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_is_reported() {
        let (handler, transport) = setup().await;
        transport.set_connected(false);

        let result = handler.handle(say("parent-1")).await;

        assert!(matches!(result, Err(CommandError::Publish(TransportError::NotConnected))));
    }
}
