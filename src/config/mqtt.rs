//! MQTT configuration

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::ValidationError;

/// Port brokers listen on when the URL names none
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// MQTT broker and topic configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker URL, `mqtt://host:port` or `tcp://host:port`
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    /// First topic level of every device topic
    #[serde(default = "default_topic_namespace")]
    pub topic_namespace: String,

    /// Client identifier presented to the broker
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// When to run the in-process broker
    #[serde(default)]
    pub embedded_broker: EmbeddedBroker,
}

/// Whether to start the in-process broker before connecting.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddedBroker {
    /// Only when the broker URL points at this host
    #[default]
    Auto,
    Always,
    Never,
}

/// Host and port parsed from the broker URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub fn is_local(&self) -> bool {
        matches!(
            self.host.as_str(),
            "localhost" | "127.0.0.1" | "0.0.0.0" | "::1" | "[::1]"
        )
    }
}

impl MqttConfig {
    /// Parse host and port out of `broker_url`.
    pub fn broker_address(&self) -> Result<BrokerAddress, ValidationError> {
        let url = Url::parse(&self.broker_url)
            .map_err(|e| ValidationError::InvalidBrokerUrl(e.to_string()))?;

        match url.scheme() {
            "mqtt" | "tcp" => {}
            other => {
                return Err(ValidationError::InvalidBrokerUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ValidationError::InvalidBrokerUrl("missing host".to_string()))?
            .to_string();

        Ok(BrokerAddress {
            host,
            port: url.port().unwrap_or(DEFAULT_MQTT_PORT),
        })
    }

    /// Whether the in-process broker should be started.
    pub fn should_embed_broker(&self) -> Result<bool, ValidationError> {
        Ok(match self.embedded_broker {
            EmbeddedBroker::Always => true,
            EmbeddedBroker::Never => false,
            EmbeddedBroker::Auto => self.broker_address()?.is_local(),
        })
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Validate MQTT configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.broker_address()?;

        let namespace = self.topic_namespace.trim_end_matches('/');
        if namespace.is_empty() || namespace.contains(&['+', '#'][..]) {
            return Err(ValidationError::InvalidTopicNamespace);
        }
        if self.client_id.is_empty() {
            return Err(ValidationError::MissingRequired("MQTT__CLIENT_ID"));
        }
        // rumqttc refuses keep-alive below 5 seconds
        if self.keep_alive_secs < 5 {
            return Err(ValidationError::InvalidKeepAlive);
        }
        Ok(())
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            topic_namespace: default_topic_namespace(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_ms: default_reconnect_delay(),
            embedded_broker: EmbeddedBroker::default(),
        }
    }
}

fn default_broker_url() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_topic_namespace() -> String {
    "toy".to_string()
}

fn default_client_id() -> String {
    "toylink-server".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid_and_local() {
        let config = MqttConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.broker_address().unwrap(),
            BrokerAddress {
                host: "localhost".to_string(),
                port: 1883
            }
        );
        assert!(config.should_embed_broker().unwrap());
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_remote_broker_is_not_embedded_in_auto_mode() {
        let config = MqttConfig {
            broker_url: "mqtt://broker.example.com:8883".to_string(),
            ..Default::default()
        };
        let address = config.broker_address().unwrap();
        assert_eq!(address.port, 8883);
        assert!(!config.should_embed_broker().unwrap());
    }

    #[test]
    fn test_embedded_broker_overrides() {
        let config = MqttConfig {
            broker_url: "mqtt://broker.example.com".to_string(),
            embedded_broker: EmbeddedBroker::Always,
            ..Default::default()
        };
        assert!(config.should_embed_broker().unwrap());

        let config = MqttConfig {
            embedded_broker: EmbeddedBroker::Never,
            ..Default::default()
        };
        assert!(!config.should_embed_broker().unwrap());
    }

    #[test]
    fn test_port_defaults_when_absent() {
        let config = MqttConfig {
            broker_url: "tcp://10.0.0.5".to_string(),
            ..Default::default()
        };
        assert_eq!(config.broker_address().unwrap().port, DEFAULT_MQTT_PORT);
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let config = MqttConfig {
            broker_url: "http://localhost:1883".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBrokerUrl(_))
        ));
    }

    #[test]
    fn test_rejects_wildcard_namespace() {
        let config = MqttConfig {
            topic_namespace: "toy/#".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTopicNamespace));
    }
}
