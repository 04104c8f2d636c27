//! ChatEventHandler - records chat utterances reported by a device.

use serde_json::Value;
use std::sync::Arc;

use super::IngestOutcome;
use crate::domain::chat::{ChatMessage, ChatSession};
use crate::domain::device::{DeviceEvent, DeviceEventType};
use crate::domain::foundation::{DeviceId, DomainError};
use crate::domain::protocol::ChatEvent;
use crate::ports::{
    ChatRepository, ConversationUpdate, DeviceEventLog, DeviceRepository, RealtimeEvent,
    RealtimeNotifier, RealtimeRoom,
};

pub struct ChatEventHandler {
    devices: Arc<dyn DeviceRepository>,
    chats: Arc<dyn ChatRepository>,
    event_log: Arc<dyn DeviceEventLog>,
    notifier: Arc<dyn RealtimeNotifier>,
}

impl ChatEventHandler {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        chats: Arc<dyn ChatRepository>,
        event_log: Arc<dyn DeviceEventLog>,
        notifier: Arc<dyn RealtimeNotifier>,
    ) -> Self {
        Self {
            devices,
            chats,
            event_log,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        device_id: &DeviceId,
        chat: &ChatEvent,
        raw: &Value,
    ) -> Result<IngestOutcome, DomainError> {
        // 1. Resolve the session, opening it on first sight
        let session = match self.chats.find_session(&chat.session_id).await? {
            Some(session) => session,
            None => {
                let session = ChatSession::from_device(
                    chat.session_id.clone(),
                    chat.child_id.clone(),
                    device_id.clone(),
                );
                let session = self.chats.create_session(&session).await?;
                tracing::info!(
                    session_id = %session.id,
                    device_id = %device_id,
                    "Opened chat session"
                );
                session
            }
        };

        // 2. Store the message, stamped with the device's time. Redeliveries
        // and retries carry the same id and are skipped by the store.
        let message = ChatMessage {
            id: ChatMessage::id_for(&session.id, chat.role, &chat.ts, &chat.content),
            session_id: session.id.clone(),
            role: chat.role,
            content: chat.content.clone(),
            tokens: chat.tokens,
            topic_tags: chat.topic_tags.clone(),
            safety_hits: chat.safety_hits.clone(),
            created_at: chat.ts,
        };
        self.chats.append_message(&message).await?;

        // 3. Mirror the raw payload into the device log
        self.event_log
            .append(&DeviceEvent::new(
                device_id.clone(),
                DeviceEventType::Chat,
                raw.clone(),
            ))
            .await?;

        // 4. Conversations go to the owning account only
        if let Some(device) = self.devices.find_by_id(device_id).await? {
            self.notifier
                .emit(
                    &[RealtimeRoom::User(device.owner_id)],
                    RealtimeEvent::ConversationUpdate(ConversationUpdate {
                        session_id: session.id.clone(),
                        message,
                    }),
                )
                .await;
        }

        tracing::info!(session_id = %session.id, device_id = %device_id, "Chat event processed");
        Ok(IngestOutcome::Applied)
    }
}
