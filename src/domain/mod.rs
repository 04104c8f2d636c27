//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, auth types)
//! - `device` - Device records and the append-only device event log entry
//! - `chat` - Chat sessions and messages reported by devices
//! - `policy` - Safety policies, version reconciliation and signed documents
//! - `protocol` - Topic codec and the typed inbound/outbound message shapes

pub mod chat;
pub mod device;
pub mod foundation;
pub mod policy;
pub mod protocol;
