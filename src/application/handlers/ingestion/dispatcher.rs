//! IngestionDispatcher - routes inbound device messages to their handlers.
//!
//! Every message goes through the same steps: decode the topic, decode and
//! validate the payload for that suffix, then run the handler with bounded
//! retry for persistence failures. Nothing here returns an error to the
//! transport loop; each failure ends in a log line and a `DispatchOutcome`.

use std::sync::Arc;
use std::time::Duration;

use super::{
    ChatEventHandler, DeviceStateHandler, DeviceTelemetryHandler, IngestOutcome, PolicyAckHandler,
};
use crate::domain::foundation::{DeviceId, DomainError};
use crate::domain::protocol::{DecodedPayload, InboundMessage, TopicCodec};
use crate::ports::{
    ChatRepository, DeviceEventLog, DeviceRepository, RealtimeNotifier, SafetyPolicyRepository,
};

/// Bounded retry for handler failures the store reports as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one
    pub max_attempts: u32,
    /// Delay before the second try; doubles for each further try
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before try number `attempt + 1`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran to completion.
    Handled(IngestOutcome),
    /// Outside the namespace, unknown suffix, or a server-to-device suffix.
    Ignored,
    /// The payload failed decoding or validation.
    Malformed,
    /// The handler kept failing; the message is dropped.
    Failed,
}

/// Ports the ingestion handlers share.
#[derive(Clone)]
pub struct IngestionPorts {
    pub devices: Arc<dyn DeviceRepository>,
    pub policies: Arc<dyn SafetyPolicyRepository>,
    pub event_log: Arc<dyn DeviceEventLog>,
    pub chats: Arc<dyn ChatRepository>,
    pub notifier: Arc<dyn RealtimeNotifier>,
}

pub struct IngestionDispatcher {
    codec: TopicCodec,
    retry: RetryPolicy,
    state: DeviceStateHandler,
    telemetry: DeviceTelemetryHandler,
    chat: ChatEventHandler,
    policy_ack: PolicyAckHandler,
}

impl IngestionDispatcher {
    pub fn new(codec: TopicCodec, ports: IngestionPorts, retry: RetryPolicy) -> Self {
        Self {
            state: DeviceStateHandler::new(
                ports.devices.clone(),
                ports.event_log.clone(),
                ports.notifier.clone(),
            ),
            telemetry: DeviceTelemetryHandler::new(
                ports.devices.clone(),
                ports.event_log.clone(),
                ports.notifier.clone(),
            ),
            chat: ChatEventHandler::new(
                ports.devices.clone(),
                ports.chats,
                ports.event_log.clone(),
                ports.notifier.clone(),
            ),
            policy_ack: PolicyAckHandler::new(
                ports.devices,
                ports.policies,
                ports.event_log,
                ports.notifier,
            ),
            codec,
            retry,
        }
    }

    pub fn codec(&self) -> &TopicCodec {
        &self.codec
    }

    /// Processes one message as received from the broker.
    pub async fn dispatch(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let Some(decoded_topic) = self.codec.decode(topic) else {
            tracing::debug!(topic, "Ignoring topic outside the device namespace");
            return DispatchOutcome::Ignored;
        };

        let suffix = match decoded_topic.kind() {
            Some(suffix) if suffix.is_inbound() => suffix,
            _ => {
                tracing::debug!(
                    topic,
                    suffix = %decoded_topic.suffix,
                    "Unhandled topic type"
                );
                return DispatchOutcome::Ignored;
            }
        };
        let device_id = decoded_topic.device_id;

        let decoded = match InboundMessage::decode(suffix, payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    device_id = %device_id,
                    suffix = %suffix,
                    error = %e,
                    "Dropping malformed device payload"
                );
                return DispatchOutcome::Malformed;
            }
        };

        let mut attempt = 1;
        loop {
            match self.handle_once(&device_id, &decoded).await {
                Ok(outcome) => return DispatchOutcome::Handled(outcome),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_after(attempt);
                    tracing::warn!(
                        device_id = %device_id,
                        suffix = %suffix,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Ingestion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        device_id = %device_id,
                        suffix = %suffix,
                        attempts = attempt,
                        error = %e,
                        payload = %decoded.raw,
                        "Dropping device message after failed ingestion"
                    );
                    return DispatchOutcome::Failed;
                }
            }
        }
    }

    async fn handle_once(
        &self,
        device_id: &DeviceId,
        decoded: &DecodedPayload,
    ) -> Result<IngestOutcome, DomainError> {
        let raw = &decoded.raw;
        match &decoded.message {
            InboundMessage::State(update) => self.state.handle(device_id, update, raw).await,
            InboundMessage::Telemetry(update) => {
                self.telemetry.handle(device_id, update, raw).await
            }
            InboundMessage::Chat(chat) => self.chat.handle(device_id, chat, raw).await,
            InboundMessage::PolicyAck(ack) => self.policy_ack.handle(device_id, ack, raw).await,
        }
    }
}
