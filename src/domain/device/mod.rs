//! Device module - paired devices and their event log.

mod device;
mod event;

pub use device::{Device, DeviceStateUpdate, DeviceStatus, TelemetryUpdate};
pub use event::{DeviceEvent, DeviceEventType};
