//! Topic codec: `<namespace>/<deviceId>/<suffix>`.
//!
//! The suffix may span several levels (`events/chat`, `policy/ack`). Device
//! identifiers never contain the separator, so the first level after the
//! namespace is always the device and everything after it is the suffix.

use std::fmt;

use crate::domain::foundation::{DeviceId, ValidationError};

pub const TOPIC_SEPARATOR: char = '/';

/// Message kinds carried on device topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicSuffix {
    /// Device → server: connectivity, firmware, battery.
    State,
    /// Device → server: cumulative play counters.
    Telemetry,
    /// Device → server: one chat utterance.
    EventsChat,
    /// Device → server: result of applying a policy.
    PolicyAck,
    /// Server → device: signed policy document.
    PolicyApply,
    /// Server → device: operator command.
    Command,
}

impl TopicSuffix {
    pub const ALL: [TopicSuffix; 6] = [
        TopicSuffix::State,
        TopicSuffix::Telemetry,
        TopicSuffix::EventsChat,
        TopicSuffix::PolicyAck,
        TopicSuffix::PolicyApply,
        TopicSuffix::Command,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicSuffix::State => "state",
            TopicSuffix::Telemetry => "telemetry",
            TopicSuffix::EventsChat => "events/chat",
            TopicSuffix::PolicyAck => "policy/ack",
            TopicSuffix::PolicyApply => "policy/apply",
            TopicSuffix::Command => "cmd",
        }
    }

    /// Looks up a recognized suffix; `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|suffix| suffix.as_str() == s)
    }

    /// Whether devices publish on this suffix (as opposed to the server).
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            TopicSuffix::State
                | TopicSuffix::Telemetry
                | TopicSuffix::EventsChat
                | TopicSuffix::PolicyAck
        )
    }
}

impl fmt::Display for TopicSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topic split into its device and suffix parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTopic {
    pub device_id: DeviceId,
    pub suffix: String,
}

impl DecodedTopic {
    /// The recognized suffix, if this is one.
    pub fn kind(&self) -> Option<TopicSuffix> {
        TopicSuffix::parse(&self.suffix)
    }
}

/// Maps between topic strings and `(device, suffix)` pairs under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCodec {
    namespace: String,
}

impl TopicCodec {
    /// Creates a codec for `namespace` (e.g. `toy`).
    ///
    /// Trailing separators are trimmed; wildcards are rejected.
    pub fn new(namespace: impl Into<String>) -> Result<Self, ValidationError> {
        let namespace = namespace.into();
        let namespace = namespace.trim_end_matches(TOPIC_SEPARATOR).to_string();
        if namespace.is_empty() {
            return Err(ValidationError::empty_field("topic_namespace"));
        }
        if namespace.contains(&['+', '#'][..]) {
            return Err(ValidationError::invalid_format(
                "topic_namespace",
                "must not contain MQTT wildcards",
            ));
        }
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn encode(&self, device_id: &DeviceId, suffix: TopicSuffix) -> String {
        self.encode_raw(device_id, suffix.as_str())
    }

    /// Encodes an arbitrary suffix string.
    pub fn encode_raw(&self, device_id: &DeviceId, suffix: &str) -> String {
        format!(
            "{ns}{sep}{device}{sep}{suffix}",
            ns = self.namespace,
            sep = TOPIC_SEPARATOR,
            device = device_id,
            suffix = suffix
        )
    }

    /// Splits `topic` into device and suffix.
    ///
    /// Returns `None` when the topic is outside the namespace, has fewer than
    /// two levels after it, or names an invalid device.
    pub fn decode(&self, topic: &str) -> Option<DecodedTopic> {
        let rest = topic
            .strip_prefix(self.namespace.as_str())?
            .strip_prefix(TOPIC_SEPARATOR)?;

        let (device, suffix) = rest.split_once(TOPIC_SEPARATOR)?;
        if suffix.is_empty() {
            return None;
        }
        let device_id = DeviceId::new(device).ok()?;

        Some(DecodedTopic {
            device_id,
            suffix: suffix.to_string(),
        })
    }

    /// Filter matching every device and every suffix depth: `<namespace>/+/#`.
    pub fn subscription_filter(&self) -> String {
        format!("{ns}{sep}+{sep}#", ns = self.namespace, sep = TOPIC_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> TopicCodec {
        TopicCodec::new("toy").unwrap()
    }

    fn device(id: &str) -> DeviceId {
        DeviceId::new(id).unwrap()
    }

    #[test]
    fn encodes_multi_level_suffix() {
        assert_eq!(
            codec().encode(&device("toy-demo-001"), TopicSuffix::EventsChat),
            "toy/toy-demo-001/events/chat"
        );
    }

    #[test]
    fn decodes_multi_level_suffix() {
        let decoded = codec().decode("toy/toy-demo-001/policy/ack").unwrap();
        assert_eq!(decoded.device_id.as_str(), "toy-demo-001");
        assert_eq!(decoded.suffix, "policy/ack");
        assert_eq!(decoded.kind(), Some(TopicSuffix::PolicyAck));
    }

    #[test]
    fn rejects_other_namespaces() {
        assert!(codec().decode("car/toy-1/state").is_none());
        assert!(codec().decode("toys/toy-1/state").is_none());
    }

    #[test]
    fn rejects_too_few_levels() {
        assert!(codec().decode("toy/toy-1").is_none());
        assert!(codec().decode("toy/toy-1/").is_none());
        assert!(codec().decode("toy/").is_none());
        assert!(codec().decode("toy").is_none());
    }

    #[test]
    fn rejects_empty_device_level() {
        assert!(codec().decode("toy//state").is_none());
    }

    #[test]
    fn unknown_suffix_decodes_but_is_unrecognized() {
        let decoded = codec().decode("toy/toy-1/firmware/log").unwrap();
        assert_eq!(decoded.suffix, "firmware/log");
        assert_eq!(decoded.kind(), None);
    }

    #[test]
    fn subscription_filter_covers_all_depths() {
        assert_eq!(codec().subscription_filter(), "toy/+/#");
    }

    #[test]
    fn namespace_trailing_separator_is_trimmed() {
        let codec = TopicCodec::new("toy/").unwrap();
        assert_eq!(codec.namespace(), "toy");
        assert!(TopicCodec::new("").is_err());
        assert!(TopicCodec::new("toy/#").is_err());
    }

    #[test]
    fn suffix_parse_covers_closed_set() {
        for suffix in TopicSuffix::ALL {
            assert_eq!(TopicSuffix::parse(suffix.as_str()), Some(suffix));
        }
        assert_eq!(TopicSuffix::parse("policy"), None);
        assert!(TopicSuffix::State.is_inbound());
        assert!(!TopicSuffix::PolicyApply.is_inbound());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            id in "[A-Za-z0-9_.-]{1,32}",
            suffix in "[a-z]{1,10}(/[a-z]{1,10}){0,3}",
        ) {
            let codec = codec();
            let device_id = DeviceId::new(id).unwrap();
            let topic = codec.encode_raw(&device_id, &suffix);
            let decoded = codec.decode(&topic).unwrap();

            prop_assert_eq!(decoded.device_id, device_id);
            prop_assert_eq!(decoded.suffix, suffix);
        }

        #[test]
        fn foreign_namespace_never_decodes(
            ns in "[a-z]{1,8}",
            rest in "[a-z0-9]{1,8}/[a-z]{1,8}",
        ) {
            prop_assume!(ns != "toy");
            let topic = format!("{}/{}", ns, rest);
            prop_assert!(codec().decode(&topic).is_none());
        }
    }
}
