//! Chat sessions and the messages devices report into them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::foundation::{
    ChatSessionId, ChildId, DeviceId, MessageId, Timestamp, ValidationError,
};

/// Speaker of a chat message.
///
/// Devices send upper-case names; lower-case spellings are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatRole {
    #[serde(alias = "child")]
    Child,
    #[serde(alias = "assistant")]
    Assistant,
    #[serde(alias = "parent")]
    Parent,
    #[serde(alias = "system")]
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::Child => "CHILD",
            ChatRole::Assistant => "ASSISTANT",
            ChatRole::Parent => "PARENT",
            ChatRole::System => "SYSTEM",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CHILD" => Ok(ChatRole::Child),
            "ASSISTANT" => Ok(ChatRole::Assistant),
            "PARENT" => Ok(ChatRole::Parent),
            "SYSTEM" => Ok(ChatRole::System),
            _ => Err(ValidationError::invalid_format(
                "role",
                format!("unknown chat role '{}'", s),
            )),
        }
    }
}

/// Surface a chat session originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSource {
    Toy,
    App,
}

impl ChatSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatSource::Toy => "toy",
            ChatSource::App => "app",
        }
    }
}

impl FromStr for ChatSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toy" => Ok(ChatSource::Toy),
            "app" => Ok(ChatSource::App),
            other => Err(ValidationError::invalid_format(
                "source",
                format!("unknown chat source '{}'", other),
            )),
        }
    }
}

/// Groups messages for one child on one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: ChatSessionId,
    pub child_id: ChildId,
    pub source: ChatSource,
    pub device_id: Option<DeviceId>,
    pub created_at: Timestamp,
}

impl ChatSession {
    /// A session opened by a device on its first message.
    pub fn from_device(id: ChatSessionId, child_id: ChildId, device_id: DeviceId) -> Self {
        Self {
            id,
            child_id,
            source: ChatSource::Toy,
            device_id: Some(device_id),
            created_at: Timestamp::now(),
        }
    }
}

/// One utterance in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: ChatSessionId,
    pub role: ChatRole,
    pub content: String,
    pub tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_hits: Option<Vec<String>>,
    pub created_at: Timestamp,
}

impl ChatMessage {
    /// Stable id for an utterance: the same report always maps to the same
    /// id, so storing it again is a no-op.
    pub fn id_for(
        session_id: &ChatSessionId,
        role: ChatRole,
        sent_at: &Timestamp,
        content: &str,
    ) -> MessageId {
        let sent_at = sent_at.to_rfc3339();
        let mut hasher = Sha256::new();
        for part in [session_id.as_str(), role.as_str(), sent_at.as_str(), content] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        MessageId::from_uuid(Uuid::from_bytes(bytes))
    }

    /// Rough token count for content that arrived without one: a token per
    /// four characters, rounded up.
    pub fn estimate_tokens(content: &str) -> u32 {
        let chars = content.chars().count() as u32;
        (chars + 3) / 4
    }
}
