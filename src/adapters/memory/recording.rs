//! Recording implementations of the outbound ports.
//!
//! Used by unit and integration tests to observe what the application layer
//! emitted or published without a broker or live WebSocket clients.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::foundation::DeviceId;
use crate::domain::protocol::TopicSuffix;
use crate::ports::{
    DeviceTransport, RealtimeEvent, RealtimeNotifier, RealtimeRoom, TransportError,
};

/// One `emit` call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub rooms: Vec<RealtimeRoom>,
    pub event: RealtimeEvent,
}

/// Notifier that keeps every emitted event.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    emitted: Mutex<Vec<EmittedEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<EmittedEvent> {
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Emitted events whose name matches, e.g. `device:update`.
    pub fn named(&self, name: &str) -> Vec<EmittedEvent> {
        self.emitted()
            .into_iter()
            .filter(|e| e.event.name() == name)
            .collect()
    }
}

#[async_trait]
impl RealtimeNotifier for RecordingNotifier {
    async fn emit(&self, rooms: &[RealtimeRoom], event: RealtimeEvent) {
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EmittedEvent {
                rooms: rooms.to_vec(),
                event,
            });
    }
}

/// One successful `publish` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub device_id: DeviceId,
    pub suffix: TopicSuffix,
    pub payload: Value,
}

/// Transport that records publishes instead of sending them.
///
/// Starts connected; `set_connected(false)` makes every publish fail with
/// `NotConnected`.
#[derive(Debug)]
pub struct RecordingTransport {
    connected: AtomicBool,
    published: Mutex<Vec<PublishedMessage>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(true),
            published: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DeviceTransport for RecordingTransport {
    async fn publish(
        &self,
        device_id: &DeviceId,
        suffix: TopicSuffix,
        payload: &Value,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PublishedMessage {
                device_id: device_id.clone(),
                suffix,
                payload: payload.clone(),
            });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
