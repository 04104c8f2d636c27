//! Chat module - conversation records reported by devices.

mod session;

pub use session::{ChatMessage, ChatRole, ChatSession, ChatSource};
