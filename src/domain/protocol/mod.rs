//! Device wire protocol: topics, inbound payloads and outbound commands.

mod command;
mod payloads;
mod topics;

pub use command::{CommandType, DeviceCommand};
pub use payloads::{ChatEvent, DecodedPayload, InboundMessage, PayloadError, PolicyAck};
pub use topics::{DecodedTopic, TopicCodec, TopicSuffix, TOPIC_SEPARATOR};
