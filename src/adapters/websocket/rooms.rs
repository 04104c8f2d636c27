//! WebSocket room registry for account- and device-scoped routing.
//!
//! Every connection gets a bounded outbox. Rooms map to sets of connections,
//! and emitting to several rooms resolves to a de-duplicated set of outboxes
//! before anything is sent.
//!
//! # Architecture
//!
//! ```text
//! Room: user:parent-1      Room: device:toy-1
//! ├── client-a             ├── client-a
//! └── client-b             └── client-c
//! ```
//!
//! An event for `[user:parent-1, device:toy-1]` reaches a, b and c once each.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::foundation::UserId;
use crate::ports::{RealtimeEvent, RealtimeNotifier, RealtimeRoom};

use super::messages::ServerMessage;

/// Default per-connection outbox size.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;

/// Unique identifier for a WebSocket client connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a new connection gets back from [`RoomRegistry::register`].
pub struct Registration {
    pub client_id: ClientId,
    /// Sender for direct replies to this client.
    pub outbox: mpsc::Sender<ServerMessage>,
    /// Everything addressed to this client, room events and replies alike.
    pub inbox: mpsc::Receiver<ServerMessage>,
}

struct ClientEntry {
    outbox: mpsc::Sender<ServerMessage>,
    rooms: HashSet<RealtimeRoom>,
}

#[derive(Default)]
struct Registry {
    clients: HashMap<ClientId, ClientEntry>,
    rooms: HashMap<RealtimeRoom, HashSet<ClientId>>,
}

impl Registry {
    fn join(&mut self, client_id: ClientId, room: RealtimeRoom) -> bool {
        let Some(entry) = self.clients.get_mut(&client_id) else {
            return false;
        };
        entry.rooms.insert(room.clone());
        self.rooms.entry(room).or_default().insert(client_id);
        true
    }

    fn leave(&mut self, client_id: ClientId, room: &RealtimeRoom) {
        if let Some(entry) = self.clients.get_mut(&client_id) {
            entry.rooms.remove(room);
        }
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&client_id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}

/// Manages realtime connections and the rooms they are in.
///
/// Implements [`RealtimeNotifier`], so ingestion handlers emit straight into
/// it. Emitting never waits on a client: a full outbox drops the event for
/// that client only.
pub struct RoomRegistry {
    inner: RwLock<Registry>,
    outbox_capacity: usize,
}

impl RoomRegistry {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Adds a connection for `user_id` and places it in that account's room.
    pub async fn register(&self, user_id: &UserId) -> Registration {
        let client_id = ClientId::new();
        let (outbox, inbox) = mpsc::channel(self.outbox_capacity);

        let mut inner = self.inner.write().await;
        inner.clients.insert(
            client_id,
            ClientEntry {
                outbox: outbox.clone(),
                rooms: HashSet::new(),
            },
        );
        inner.join(client_id, RealtimeRoom::User(user_id.clone()));

        Registration {
            client_id,
            outbox,
            inbox,
        }
    }

    /// Adds a registered connection to `room`. Returns false for unknown
    /// connections.
    pub async fn join(&self, client_id: ClientId, room: RealtimeRoom) -> bool {
        self.inner.write().await.join(client_id, room)
    }

    pub async fn leave(&self, client_id: ClientId, room: &RealtimeRoom) {
        self.inner.write().await.leave(client_id, room);
    }

    /// Drops a connection and its memberships.
    pub async fn unregister(&self, client_id: ClientId) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.clients.remove(&client_id) {
            for room in &entry.rooms {
                inner.leave(client_id, room);
            }
        }
    }

    /// Number of connections in `room`.
    pub async fn client_count(&self, room: &RealtimeRoom) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    pub async fn total_client_count(&self) -> usize {
        self.inner.read().await.clients.len()
    }

    pub async fn active_rooms(&self) -> Vec<RealtimeRoom> {
        self.inner.read().await.rooms.keys().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }
}

#[async_trait]
impl RealtimeNotifier for RoomRegistry {
    async fn emit(&self, rooms: &[RealtimeRoom], event: RealtimeEvent) {
        let name = event.name();
        let message = ServerMessage::from(event);

        let inner = self.inner.read().await;
        let targets: HashSet<ClientId> = rooms
            .iter()
            .filter_map(|room| inner.rooms.get(room))
            .flatten()
            .copied()
            .collect();

        for client_id in targets {
            let Some(entry) = inner.clients.get(&client_id) else {
                continue;
            };
            match entry.outbox.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(client_id = %client_id, event = name, "Outbox full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::trace!(client_id = %client_id, "Outbox closed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::Device;
    use crate::domain::foundation::DeviceId;

    fn user() -> UserId {
        UserId::new("parent-1").unwrap()
    }

    fn device_id() -> DeviceId {
        DeviceId::new("toy-1").unwrap()
    }

    fn update() -> RealtimeEvent {
        RealtimeEvent::DeviceUpdate(Device::paired(device_id(), user(), None))
    }

    #[tokio::test]
    async fn register_joins_the_account_room() {
        let registry = RoomRegistry::default();
        let _reg = registry.register(&user()).await;

        assert_eq!(registry.client_count(&RealtimeRoom::User(user())).await, 1);
        assert_eq!(registry.total_client_count().await, 1);
    }

    #[tokio::test]
    async fn emit_reaches_room_members() {
        let registry = RoomRegistry::default();
        let mut reg = registry.register(&user()).await;

        registry.emit(&[RealtimeRoom::User(user())], update()).await;

        let received = reg.inbox.recv().await.unwrap();
        assert!(matches!(received, ServerMessage::DeviceUpdate(_)));
    }

    #[tokio::test]
    async fn client_in_several_target_rooms_receives_once() {
        let registry = RoomRegistry::default();
        let mut reg = registry.register(&user()).await;
        assert!(registry.join(reg.client_id, RealtimeRoom::Device(device_id())).await);

        registry
            .emit(
                &[RealtimeRoom::User(user()), RealtimeRoom::Device(device_id())],
                update(),
            )
            .await;

        assert!(reg.inbox.try_recv().is_ok());
        assert!(reg.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_accounts_do_not_receive() {
        let registry = RoomRegistry::default();
        let mut other = registry.register(&UserId::new("parent-2").unwrap()).await;

        registry.emit(&[RealtimeRoom::User(user())], update()).await;

        assert!(other.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_outbox_drops_instead_of_blocking() {
        let registry = RoomRegistry::new(1);
        let mut reg = registry.register(&user()).await;
        let room = [RealtimeRoom::User(user())];

        registry.emit(&room, update()).await;
        registry.emit(&room, update()).await;

        assert!(reg.inbox.try_recv().is_ok());
        assert!(reg.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_and_unregister_clean_up_rooms() {
        let registry = RoomRegistry::default();
        let reg = registry.register(&user()).await;
        let device_room = RealtimeRoom::Device(device_id());

        registry.join(reg.client_id, device_room.clone()).await;
        assert_eq!(registry.client_count(&device_room).await, 1);

        registry.leave(reg.client_id, &device_room).await;
        assert_eq!(registry.client_count(&device_room).await, 0);

        registry.unregister(reg.client_id).await;
        assert_eq!(registry.total_client_count().await, 0);
        assert!(registry.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn join_requires_registration() {
        let registry = RoomRegistry::default();
        assert!(!registry.join(ClientId::new(), RealtimeRoom::Device(device_id())).await);
    }
}
