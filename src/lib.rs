//! Toylink - cloud side of a companion-toy fleet.
//!
//! Devices talk MQTT: they report state, telemetry, chat turns and policy
//! acknowledgements, and receive commands and signed safety policies.
//! Operators manage guardrails over a REST API and watch devices over a
//! realtime WebSocket channel.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
