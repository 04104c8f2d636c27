//! In-memory adapters: the store used without a database, and recording
//! stand-ins for the realtime and device transports.

mod recording;
mod store;

pub use recording::{
    EmittedEvent, PublishedMessage, RecordingNotifier, RecordingTransport,
};
pub use store::InMemoryStore;
