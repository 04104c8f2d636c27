//! Chat session and message persistence port.
//!
//! # Design
//!
//! Session identifiers are minted by devices, so the first message of a
//! session arrives for an id the store has never seen. `create_session` is
//! therefore create-or-reuse: when two messages race to create the same
//! session, both end up with the stored one.

use async_trait::async_trait;

use crate::domain::chat::{ChatMessage, ChatSession};
use crate::domain::foundation::{ChatSessionId, DomainError};

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a session by its device-supplied id.
    async fn find_session(&self, id: &ChatSessionId) -> Result<Option<ChatSession>, DomainError>;

    /// Stores `session` unless one with the same id exists; returns whichever
    /// is stored afterwards.
    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, DomainError>;

    /// Appends a message to an existing session.
    ///
    /// A message whose id is already stored is skipped, so replaying the
    /// same report leaves one copy.
    ///
    /// # Errors
    ///
    /// - `ChatSessionNotFound` if the session does not exist
    /// - `DatabaseError` on persistence failure
    async fn append_message(&self, message: &ChatMessage) -> Result<(), DomainError>;
}
