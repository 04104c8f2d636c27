//! MQTT adapters: the device transport and the optional embedded broker.

mod broker;
mod client;

pub use broker::{BrokerError, LocalBroker};
pub use client::{MqttConnection, MqttTransport};
