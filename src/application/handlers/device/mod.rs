//! Device handlers - operator actions on a single paired device.

mod get_device_health;
mod pair_device;
mod send_command;

pub use get_device_health::{DeviceHealth, GetDeviceHealthHandler, GetDeviceHealthQuery};
pub use pair_device::{PairDeviceCommand, PairDeviceHandler};
pub use send_command::{SendCommandCommand, SendCommandHandler};

use thiserror::Error;

use crate::domain::foundation::{ChildId, DeviceId, DomainError};
use crate::ports::TransportError;

/// Errors from device operations.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    #[error("device {0} is already paired")]
    AlreadyPaired(DeviceId),

    #[error("access to child {0} denied")]
    ChildAccessDenied(ChildId),

    #[error("failed to publish to device: {0}")]
    Publish(#[from] TransportError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
