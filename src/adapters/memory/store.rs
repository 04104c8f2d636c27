//! In-memory implementation of every store port.
//!
//! Backs the integration tests and local runs without a database. All
//! state lives behind one `tokio::sync::RwLock`, so each port call is
//! atomic with respect to the others, which is stronger than the
//! read-committed isolation the Postgres adapters provide.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::domain::chat::{ChatMessage, ChatSession};
use crate::domain::device::{Device, DeviceEvent, DeviceStateUpdate, TelemetryUpdate};
use crate::domain::foundation::{
    ChatSessionId, ChildId, DeviceId, DomainError, ErrorCode, UserId,
};
use crate::domain::policy::SafetyPolicy;
use crate::ports::{
    AccessChecker, ChatRepository, DeviceEventLog, DeviceRepository, SafetyPolicyRepository,
};

#[derive(Default)]
struct StoreState {
    devices: HashMap<DeviceId, Device>,
    policies: HashMap<ChildId, SafetyPolicy>,
    events: Vec<DeviceEvent>,
    sessions: HashMap<ChatSessionId, ChatSession>,
    messages: Vec<ChatMessage>,
    child_access: HashSet<(UserId, ChildId)>,
}

/// Process-local store for devices, policies, events and chats.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// store.save(&Device::paired(device_id, owner_id, Some(child_id))).await?;
/// store.grant_child_access(owner_id, child_id).await;
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `user_id` act for `child_id`.
    pub async fn grant_child_access(&self, user_id: UserId, child_id: ChildId) {
        self.state.write().await.child_access.insert((user_id, child_id));
    }

    // === Test Helpers ===

    /// Every event logged for a device, oldest first.
    pub async fn events_for(&self, device_id: &DeviceId) -> Vec<DeviceEvent> {
        self.state
            .read()
            .await
            .events
            .iter()
            .filter(|e| &e.device_id == device_id)
            .cloned()
            .collect()
    }

    /// Messages stored in a session, oldest first.
    pub async fn messages_in(&self, session_id: &ChatSessionId) -> Vec<ChatMessage> {
        self.state
            .read()
            .await
            .messages
            .iter()
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect()
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

fn device_not_found(id: &DeviceId) -> DomainError {
    DomainError::new(ErrorCode::DeviceNotFound, format!("Device {} not found", id))
        .with_detail("device_id", id.as_str())
}

#[async_trait]
impl DeviceRepository for InMemoryStore {
    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<Device>, DomainError> {
        Ok(self.state.read().await.devices.get(id).cloned())
    }

    async fn list_for_child(&self, child_id: &ChildId) -> Result<Vec<Device>, DomainError> {
        let state = self.state.read().await;
        let mut devices: Vec<Device> = state
            .devices
            .values()
            .filter(|d| d.child_id.as_ref() == Some(child_id))
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(devices)
    }

    async fn save(&self, device: &Device) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .devices
            .insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn apply_state(
        &self,
        id: &DeviceId,
        update: &DeviceStateUpdate,
    ) -> Result<Option<Device>, DomainError> {
        let mut state = self.state.write().await;
        let device = state.devices.get_mut(id).ok_or_else(|| device_not_found(id))?;

        if device.is_stale_state(&update.last_seen) {
            return Ok(None);
        }
        device.apply_state(update);
        Ok(Some(device.clone()))
    }

    async fn apply_telemetry(
        &self,
        id: &DeviceId,
        update: &TelemetryUpdate,
    ) -> Result<Option<Device>, DomainError> {
        let mut state = self.state.write().await;
        let device = state.devices.get_mut(id).ok_or_else(|| device_not_found(id))?;

        if device.is_stale_telemetry(update.reported_at.as_ref()) {
            return Ok(None);
        }
        device.apply_telemetry(update);
        Ok(Some(device.clone()))
    }

    async fn confirm_policy_version(&self, id: &DeviceId, version: u32) -> Result<Device, DomainError> {
        let mut state = self.state.write().await;
        let device = state.devices.get_mut(id).ok_or_else(|| device_not_found(id))?;
        device.confirm_policy_version(version);
        Ok(device.clone())
    }
}

#[async_trait]
impl SafetyPolicyRepository for InMemoryStore {
    async fn find_by_child(&self, child_id: &ChildId) -> Result<Option<SafetyPolicy>, DomainError> {
        Ok(self.state.read().await.policies.get(child_id).cloned())
    }

    async fn upsert(&self, policy: &SafetyPolicy) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let mut incoming = policy.clone();
        if let Some(stored) = state.policies.get(&policy.child_id) {
            incoming.device_version = incoming.device_version.max(stored.device_version);
        }
        state.policies.insert(policy.child_id.clone(), incoming);
        Ok(())
    }

    async fn save_if_version(
        &self,
        policy: &SafetyPolicy,
        expected_version: Option<u32>,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        let stored_version = state.policies.get(&policy.child_id).map(|p| p.cloud_version);
        if stored_version != expected_version {
            return Ok(false);
        }

        let mut incoming = policy.clone();
        if let Some(stored) = state.policies.get(&policy.child_id) {
            incoming.device_version = incoming.device_version.max(stored.device_version);
        }
        state.policies.insert(policy.child_id.clone(), incoming);
        Ok(true)
    }

    async fn record_device_version(
        &self,
        child_id: &ChildId,
        version: u32,
    ) -> Result<Option<SafetyPolicy>, DomainError> {
        let mut state = self.state.write().await;
        let Some(policy) = state.policies.get_mut(child_id) else {
            return Ok(None);
        };
        // Out-of-range acks leave the row untouched.
        let _ = policy.record_device_ack(version);
        Ok(Some(policy.clone()))
    }
}

#[async_trait]
impl DeviceEventLog for InMemoryStore {
    async fn append(&self, event: &DeviceEvent) -> Result<(), DomainError> {
        self.state.write().await.events.push(event.clone());
        Ok(())
    }

    async fn recent_for_device(
        &self,
        device_id: &DeviceId,
        limit: u32,
    ) -> Result<Vec<DeviceEvent>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .rev()
            .filter(|e| &e.device_id == device_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn find_session(&self, id: &ChatSessionId) -> Result<Option<ChatSession>, DomainError> {
        Ok(self.state.read().await.sessions.get(id).cloned())
    }

    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, DomainError> {
        let mut state = self.state.write().await;
        let stored = state
            .sessions
            .entry(session.id.clone())
            .or_insert_with(|| session.clone());
        Ok(stored.clone())
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(&message.session_id) {
            return Err(DomainError::new(
                ErrorCode::ChatSessionNotFound,
                format!("Chat session {} not found", message.session_id),
            ));
        }
        if state.messages.iter().any(|m| m.id == message.id) {
            return Ok(());
        }
        state.messages.push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl AccessChecker for InMemoryStore {
    async fn can_access_child(&self, user_id: &UserId, child_id: &ChildId) -> Result<bool, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .child_access
            .contains(&(user_id.clone(), child_id.clone())))
    }
}
