//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Bearer token validation (JWT, mock)
//! - `http` - Operator REST API
//! - `memory` - In-memory store and recording transports
//! - `mqtt` - Device broker client and the embedded broker
//! - `postgres` - PostgreSQL store
//! - `signing` - Ed25519 policy signer
//! - `websocket` - Realtime operator channel

pub mod auth;
pub mod http;
pub mod memory;
pub mod mqtt;
pub mod postgres;
pub mod signing;
pub mod websocket;

pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use memory::InMemoryStore;
pub use mqtt::{LocalBroker, MqttConnection, MqttTransport};
pub use signing::{Ed25519PolicySigner, KeyMaterial};
pub use websocket::{RoomRegistry, WebSocketState};
