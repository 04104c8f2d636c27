//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, authentication types and the error
//! vocabulary shared by every other domain module.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AccountRole, AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ChatSessionId, ChildId, CommandId, DeviceId, EventId, MessageId, UserId};
pub use timestamp::Timestamp;
