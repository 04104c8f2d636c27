//! WebSocket adapters for the realtime operator channel.
//!
//! Ingestion results reach connected operators through this module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Ingestion handlers                               │
//! │   emit(rooms, RealtimeEvent) through the RealtimeNotifier port       │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RoomRegistry                                    │
//! │   Room: user:parent-1    Room: device:toy-1                          │
//! │   ├── client-a           ├── client-a                                │
//! │   └── client-b           └── client-c                                │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │ bounded outbox per client
//!                                     ▼
//!                            WebSocket connections
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`rooms`] - Room registry and per-client outboxes
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod handler;
pub mod messages;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{
    ClientMessage, ConnectedMessage, ErrorMessage, PongMessage, ServerMessage,
    SubscriptionMessage,
};
pub use rooms::{ClientId, Registration, RoomRegistry, DEFAULT_OUTBOX_CAPACITY};
