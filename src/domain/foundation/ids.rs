//! Strongly-typed identifier value objects.
//!
//! Device, child, account and chat-session identifiers are opaque strings
//! assigned outside this service (firmware, pairing, account store). Event,
//! message and command identifiers are generated here as UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Characters that may never appear inside a device identifier because they
/// carry meaning in topic strings.
const RESERVED_TOPIC_CHARS: [char; 3] = ['/', '+', '#'];

/// Identifier of a physical companion device (e.g. `toy-demo-001`).
///
/// Never contains the topic separator or MQTT wildcards, which is what makes
/// topic decoding unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a DeviceId, rejecting empty values and topic metacharacters.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("device_id"));
        }
        if id.contains(&RESERVED_TOPIC_CHARS[..]) {
            return Err(ValidationError::invalid_format(
                "device_id",
                "must not contain '/', '+' or '#'",
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Declares a non-empty string identifier with the usual conversions.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, returning error if empty.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identifier of a child profile.
    ChildId,
    "child_id"
);

string_id!(
    /// Account (operator/parent) identifier, as carried in access tokens.
    UserId,
    "user_id"
);

string_id!(
    /// Chat session identifier. Supplied by the device, so it is not a UUID.
    ChatSessionId,
    "session_id"
);

/// Unique identifier for an appended device event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random EventId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an EventId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an outbound device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Creates a new random CommandId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_accepts_plain_identifier() {
        let id = DeviceId::new("toy-demo-001").unwrap();
        assert_eq!(id.as_str(), "toy-demo-001");
        assert_eq!(id.to_string(), "toy-demo-001");
    }

    #[test]
    fn device_id_rejects_empty() {
        assert!(DeviceId::new("").is_err());
    }

    #[test]
    fn device_id_rejects_separator_and_wildcards() {
        assert!(DeviceId::new("toy/1").is_err());
        assert!(DeviceId::new("toy+").is_err());
        assert!(DeviceId::new("#").is_err());
    }

    #[test]
    fn device_id_deserialization_validates() {
        let ok: Result<DeviceId, _> = serde_json::from_str("\"toy-1\"");
        assert!(ok.is_ok());

        let bad: Result<DeviceId, _> = serde_json::from_str("\"toy/1\"");
        assert!(bad.is_err());
    }

    #[test]
    fn string_ids_reject_blank_values() {
        assert!(ChildId::new("   ").is_err());
        assert!(UserId::new("").is_err());
        assert!(ChatSessionId::new("").is_err());
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let child = ChildId::new("child-1").unwrap();
        assert_eq!(serde_json::to_string(&child).unwrap(), "\"child-1\"");
    }

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
        assert_ne!(MessageId::new(), MessageId::new());
        assert_ne!(CommandId::new(), CommandId::new());
    }
}
