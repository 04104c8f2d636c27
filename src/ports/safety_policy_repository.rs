//! Safety policy repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ChildId, DomainError};
use crate::domain::policy::SafetyPolicy;

/// Persistence for the one `SafetyPolicy` each child has.
#[async_trait]
pub trait SafetyPolicyRepository: Send + Sync {
    async fn find_by_child(&self, child_id: &ChildId) -> Result<Option<SafetyPolicy>, DomainError>;

    /// Insert the policy or replace the stored one for the same child.
    ///
    /// `device_version` keeps the larger of the stored and incoming values.
    async fn upsert(&self, policy: &SafetyPolicy) -> Result<(), DomainError>;

    /// Writes `policy` only if the stored row is still at `expected_version`.
    ///
    /// `None` means "no row yet": the insert happens only if the child has
    /// no policy. Returns `false` when another writer got there first and
    /// nothing was written.
    async fn save_if_version(
        &self,
        policy: &SafetyPolicy,
        expected_version: Option<u32>,
    ) -> Result<bool, DomainError>;

    /// Raises `device_version` to `version`.
    ///
    /// Never lowers it and never raises it above `cloud_version`; in either
    /// case the stored row is left as is. Returns `None` if the child has no
    /// policy.
    async fn record_device_version(
        &self,
        child_id: &ChildId,
        version: u32,
    ) -> Result<Option<SafetyPolicy>, DomainError>;
}
