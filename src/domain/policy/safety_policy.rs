//! Per-child safety policy and the guardrail edits operators make to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ChildId, Timestamp, ValidationError};

/// Last valid minute of a day (23:59).
pub const MAX_MINUTE_OF_DAY: u16 = 1439;

/// Content rating a device must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AgeRating {
    #[default]
    G,
    PG,
    PG13,
}

impl AgeRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRating::G => "G",
            AgeRating::PG => "PG",
            AgeRating::PG13 => "PG13",
        }
    }
}

impl fmt::Display for AgeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeRating {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "G" => Ok(AgeRating::G),
            "PG" => Ok(AgeRating::PG),
            "PG13" => Ok(AgeRating::PG13),
            other => Err(ValidationError::invalid_format(
                "ageRating",
                format!("unknown age rating '{}'", other),
            )),
        }
    }
}

/// Daily window during which the device stays silent.
///
/// The window may wrap midnight (`start_min > end_min`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    pub start_min: u16,
    pub end_min: u16,
}

impl QuietHours {
    pub fn new(start_min: u16, end_min: u16) -> Result<Self, ValidationError> {
        check_minute_of_day("quietStartMin", start_min)?;
        check_minute_of_day("quietEndMin", end_min)?;
        Ok(Self { start_min, end_min })
    }
}

fn check_minute_of_day(field: &str, value: u16) -> Result<(), ValidationError> {
    if value > MAX_MINUTE_OF_DAY {
        return Err(ValidationError::out_of_range(
            field,
            0,
            i64::from(MAX_MINUTE_OF_DAY),
            i64::from(value),
        ));
    }
    Ok(())
}

/// Guardrail configuration for one child.
///
/// `cloud_version` is bumped by every operator edit; `device_version` trails
/// it and only moves when a device acknowledges applying a version. The two
/// are equal exactly when the child's device is in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyPolicy {
    pub child_id: ChildId,
    pub age_rating: AgeRating,
    pub blocked_keywords: Vec<String>,
    pub allowed_topics: Option<Vec<String>>,
    pub disallowed_topics: Option<Vec<String>>,
    pub quiet_start_min: Option<u16>,
    pub quiet_end_min: Option<u16>,
    pub daily_minutes_max: Option<u32>,
    pub custom_instructions: Option<String>,
    pub cloud_version: u32,
    pub device_version: u32,
    pub updated_at: Timestamp,
}

impl SafetyPolicy {
    /// The policy a child gets before anyone configured it: rated `G`, nothing
    /// blocked, version 1 authored and nothing applied yet.
    pub fn with_defaults(child_id: ChildId) -> Self {
        Self {
            child_id,
            age_rating: AgeRating::G,
            blocked_keywords: Vec::new(),
            allowed_topics: None,
            disallowed_topics: None,
            quiet_start_min: None,
            quiet_end_min: None,
            daily_minutes_max: None,
            custom_instructions: None,
            cloud_version: 1,
            device_version: 0,
            updated_at: Timestamp::now(),
        }
    }

    /// Creates a policy from the first edit ever made for a child.
    ///
    /// The result carries `cloud_version = 1`.
    pub fn from_first_edit(child_id: ChildId, edit: &GuardrailEdit) -> Result<Self, ValidationError> {
        let mut policy = Self::with_defaults(child_id);
        policy.cloud_version = 0;
        policy.apply_edit(edit)?;
        Ok(policy)
    }

    /// Quiet hours, present only when both ends are configured.
    pub fn quiet_hours(&self) -> Option<QuietHours> {
        match (self.quiet_start_min, self.quiet_end_min) {
            (Some(start_min), Some(end_min)) => Some(QuietHours { start_min, end_min }),
            _ => None,
        }
    }

    pub fn is_in_sync(&self) -> bool {
        self.cloud_version == self.device_version
    }

    /// Applies the fields present in `edit` and bumps `cloud_version` by one.
    ///
    /// Nothing is changed if the edit fails validation.
    pub fn apply_edit(&mut self, edit: &GuardrailEdit) -> Result<(), ValidationError> {
        edit.validate()?;

        if let Some(rating) = edit.age_rating {
            self.age_rating = rating;
        }
        if let Some(keywords) = &edit.blocked_keywords {
            self.blocked_keywords = keywords.clone();
        }
        if let Some(topics) = &edit.allowed_topics {
            self.allowed_topics = Some(topics.clone());
        }
        if let Some(topics) = &edit.disallowed_topics {
            self.disallowed_topics = Some(topics.clone());
        }
        if let Some(minutes) = edit.daily_minutes_max {
            self.daily_minutes_max = Some(minutes);
        }
        if let Some(start) = edit.quiet_start_min {
            self.quiet_start_min = Some(start);
        }
        if let Some(end) = edit.quiet_end_min {
            self.quiet_end_min = Some(end);
        }
        if let Some(instructions) = &edit.custom_instructions {
            self.custom_instructions = Some(instructions.clone());
        }

        self.cloud_version += 1;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Records that the device applied `version`.
    ///
    /// Returns whether `device_version` moved. Versions the cloud never
    /// issued are rejected, and older versions are ignored.
    pub fn record_device_ack(&mut self, version: u32) -> Result<bool, ValidationError> {
        if version > self.cloud_version {
            return Err(ValidationError::out_of_range(
                "policyVersion",
                0,
                i64::from(self.cloud_version),
                i64::from(version),
            ));
        }
        if version <= self.device_version {
            return Ok(false);
        }
        self.device_version = version;
        self.updated_at = Timestamp::now();
        Ok(true)
    }
}

/// Partial guardrail update submitted by an operator.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailEdit {
    pub age_rating: Option<AgeRating>,
    pub blocked_keywords: Option<Vec<String>>,
    pub allowed_topics: Option<Vec<String>>,
    pub disallowed_topics: Option<Vec<String>>,
    pub daily_minutes_max: Option<u32>,
    pub quiet_start_min: Option<u16>,
    pub quiet_end_min: Option<u16>,
    pub custom_instructions: Option<String>,
}

impl GuardrailEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(start) = self.quiet_start_min {
            check_minute_of_day("quietStartMin", start)?;
        }
        if let Some(end) = self.quiet_end_min {
            check_minute_of_day("quietEndMin", end)?;
        }
        if let Some(keywords) = &self.blocked_keywords {
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ValidationError::empty_field("blockedKeywords[]"));
            }
        }
        Ok(())
    }
}
