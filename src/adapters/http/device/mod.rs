//! HTTP adapter for device endpoints.
//!
//! - `POST /api/devices/pair` - Pair a device to the caller's account
//! - `POST /api/devices/:deviceId/commands` - Publish a command
//! - `GET /api/devices/:deviceId/health` - Device and its recent events

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::device_routes;
