//! Device record and the per-field updates devices report about themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ChildId, DeviceId, Timestamp, UserId, ValidationError};

/// Connectivity status reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(DeviceStatus::Online),
            "offline" => Ok(DeviceStatus::Offline),
            "unknown" => Ok(DeviceStatus::Unknown),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown device status '{}'", other),
            )),
        }
    }
}

/// A paired companion device.
///
/// Serialized in camelCase because this is the object pushed to operators in
/// `device:update` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub owner_id: UserId,
    pub child_id: Option<ChildId>,
    pub display_name: String,
    pub status: DeviceStatus,
    pub firmware_version: Option<String>,
    pub tpu_present: bool,
    pub battery_pct: Option<u8>,
    pub play_time_min: u32,
    pub adventures_count: u32,
    pub last_seen: Option<Timestamp>,
    /// Device-side time of the telemetry totals currently stored, when the
    /// device reported one.
    pub telemetry_at: Option<Timestamp>,
    /// Last policy version the device confirmed applying.
    pub policy_version: u32,
    pub created_at: Timestamp,
}

impl Device {
    /// A freshly paired device with no reported state.
    pub fn paired(id: DeviceId, owner_id: UserId, child_id: Option<ChildId>) -> Self {
        let display_name = format!("Device {}", id);
        Self {
            id,
            owner_id,
            child_id,
            display_name,
            status: DeviceStatus::Unknown,
            firmware_version: None,
            tpu_present: false,
            battery_pct: None,
            play_time_min: 0,
            adventures_count: 0,
            last_seen: None,
            telemetry_at: None,
            policy_version: 0,
            created_at: Timestamp::now(),
        }
    }

    /// Whether a state report stamped `last_seen` is older than what is stored.
    pub fn is_stale_state(&self, last_seen: &Timestamp) -> bool {
        self.last_seen
            .map(|stored| last_seen.is_before(&stored))
            .unwrap_or(false)
    }

    /// Whether a telemetry report is older than the stored totals.
    ///
    /// Reports without a device timestamp are never considered stale.
    pub fn is_stale_telemetry(&self, reported_at: Option<&Timestamp>) -> bool {
        match (reported_at, self.telemetry_at.as_ref()) {
            (Some(reported), Some(stored)) => reported.is_before(stored),
            _ => false,
        }
    }

    /// Applies a state report field by field.
    pub fn apply_state(&mut self, update: &DeviceStateUpdate) {
        self.status = update.status;
        self.firmware_version = Some(update.firmware_version.clone());
        self.tpu_present = update.tpu_present;
        self.battery_pct = Some(update.battery_pct);
        self.last_seen = Some(update.last_seen);
        if let Some(child_id) = &update.child_id {
            self.child_id = Some(child_id.clone());
        }
    }

    /// Replaces the cumulative counters with the reported totals.
    pub fn apply_telemetry(&mut self, update: &TelemetryUpdate) {
        self.play_time_min = update.play_time_min;
        self.adventures_count = update.adventures_count;
        if update.reported_at.is_some() {
            self.telemetry_at = update.reported_at;
        }
    }

    /// Advances the confirmed policy version; never moves it backwards.
    ///
    /// Returns true if the stored value changed.
    pub fn confirm_policy_version(&mut self, version: u32) -> bool {
        if version > self.policy_version {
            self.policy_version = version;
            true
        } else {
            false
        }
    }
}

/// Fields a `state` message sets on the device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStateUpdate {
    pub status: DeviceStatus,
    pub firmware_version: String,
    pub tpu_present: bool,
    pub battery_pct: u8,
    pub last_seen: Timestamp,
    pub child_id: Option<ChildId>,
}

/// Cumulative totals a `telemetry` message sets on the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryUpdate {
    pub play_time_min: u32,
    pub adventures_count: u32,
    pub reported_at: Option<Timestamp>,
}
