//! PairDeviceHandler - registers a device under the caller's account.

use std::sync::Arc;

use super::CommandError;
use crate::domain::device::Device;
use crate::domain::foundation::{ChildId, DeviceId, UserId};
use crate::ports::{AccessChecker, DeviceRepository};

#[derive(Debug, Clone)]
pub struct PairDeviceCommand {
    pub user_id: UserId,
    pub device_id: DeviceId,
    pub child_id: Option<ChildId>,
}

pub struct PairDeviceHandler {
    devices: Arc<dyn DeviceRepository>,
    access: Arc<dyn AccessChecker>,
}

impl PairDeviceHandler {
    pub fn new(devices: Arc<dyn DeviceRepository>, access: Arc<dyn AccessChecker>) -> Self {
        Self { devices, access }
    }

    pub async fn handle(&self, cmd: PairDeviceCommand) -> Result<Device, CommandError> {
        if let Some(child_id) = &cmd.child_id {
            if !self.access.can_access_child(&cmd.user_id, child_id).await? {
                return Err(CommandError::ChildAccessDenied(child_id.clone()));
            }
        }

        if self.devices.find_by_id(&cmd.device_id).await?.is_some() {
            return Err(CommandError::AlreadyPaired(cmd.device_id));
        }

        let device = Device::paired(cmd.device_id, cmd.user_id, cmd.child_id);
        self.devices.save(&device).await?;

        tracing::info!(device_id = %device.id, owner_id = %device.owner_id, "Device paired");
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;

    fn parent() -> UserId {
        UserId::new("parent-1").unwrap()
    }

    fn cmd(child: Option<&str>) -> PairDeviceCommand {
        PairDeviceCommand {
            user_id: parent(),
            device_id: DeviceId::new("toy-demo-001").unwrap(),
            child_id: child.map(|c| ChildId::new(c).unwrap()),
        }
    }

    #[tokio::test]
    async fn pairs_once() {
        let store = Arc::new(InMemoryStore::new());
        store.grant_child_access(parent(), ChildId::new("child-1").unwrap()).await;
        let handler = PairDeviceHandler::new(store.clone(), store.clone());

        let device = handler.handle(cmd(Some("child-1"))).await.unwrap();
        assert_eq!(device.owner_id, parent());
        assert_eq!(device.policy_version, 0);

        let again = handler.handle(cmd(None)).await;
        assert!(matches!(again, Err(CommandError::AlreadyPaired(_))));
    }

    #[tokio::test]
    async fn linking_someone_elses_child_is_denied() {
        let store = Arc::new(InMemoryStore::new());
        let handler = PairDeviceHandler::new(store.clone(), store.clone());

        let result = handler.handle(cmd(Some("child-9"))).await;

        assert!(matches!(result, Err(CommandError::ChildAccessDenied(_))));
        assert!(store.find_by_id(&DeviceId::new("toy-demo-001").unwrap()).await.unwrap().is_none());
    }
}
