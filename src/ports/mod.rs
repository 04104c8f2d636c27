//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `DeviceRepository` - Device records, updated field by field
//! - `SafetyPolicyRepository` - One guardrail policy per child
//! - `DeviceEventLog` - Append-only audit of inbound device messages
//! - `ChatRepository` - Chat sessions (create-or-reuse) and messages
//! - `AccessChecker` - Account to child authorization
//!
//! ## Messaging Ports
//!
//! - `DeviceTransport` - Publish commands and policies to devices
//! - `RealtimeNotifier` - Best-effort fan-out to operator connections
//!
//! ## Security Ports
//!
//! - `SessionValidator` - Bearer token validation
//! - `PolicySigner` - Detached signatures over policy documents

mod access_checker;
mod chat_repository;
mod device_event_log;
mod device_repository;
mod device_transport;
mod policy_signer;
mod realtime_notifier;
mod safety_policy_repository;
mod session_validator;

pub use access_checker::AccessChecker;
pub use chat_repository::ChatRepository;
pub use device_event_log::DeviceEventLog;
pub use device_repository::DeviceRepository;
pub use device_transport::{DeviceTransport, TransportError};
pub use policy_signer::{PolicySigner, PublicKeyInfo, SignerError};
pub use realtime_notifier::{
    ConversationUpdate, PolicyAckNotice, RealtimeEvent, RealtimeNotifier, RealtimeRoom,
};
pub use safety_policy_repository::SafetyPolicyRepository;
pub use session_validator::SessionValidator;
