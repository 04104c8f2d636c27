//! UpdateGuardrailsHandler - applies an operator's partial guardrail edit.

use std::sync::Arc;

use super::{ensure_child_access, PolicyError};
use crate::domain::foundation::{ChildId, UserId};
use crate::domain::policy::{GuardrailEdit, SafetyPolicy};
use crate::ports::{AccessChecker, SafetyPolicyRepository};

#[derive(Debug, Clone)]
pub struct UpdateGuardrailsCommand {
    pub user_id: UserId,
    pub child_id: ChildId,
    pub edit: GuardrailEdit,
}

/// Read-edit-write rounds before giving up on a contended child.
const MAX_EDIT_ATTEMPTS: u32 = 5;

pub struct UpdateGuardrailsHandler {
    access: Arc<dyn AccessChecker>,
    policies: Arc<dyn SafetyPolicyRepository>,
}

impl UpdateGuardrailsHandler {
    pub fn new(access: Arc<dyn AccessChecker>, policies: Arc<dyn SafetyPolicyRepository>) -> Self {
        Self { access, policies }
    }

    /// Every accepted edit bumps `cloud_version` by exactly one; the first
    /// edit for a child yields version 1.
    ///
    /// The write only lands if the stored version is still the one the edit
    /// was applied to. A concurrent edit makes this round re-read and apply
    /// again on top of it.
    pub async fn handle(&self, cmd: UpdateGuardrailsCommand) -> Result<SafetyPolicy, PolicyError> {
        // 1. Authorize
        ensure_child_access(self.access.as_ref(), &cmd.user_id, &cmd.child_id).await?;

        for attempt in 1..=MAX_EDIT_ATTEMPTS {
            // 2. Load and edit
            let (policy, read_version) = match self.policies.find_by_child(&cmd.child_id).await? {
                Some(mut policy) => {
                    let read_version = policy.cloud_version;
                    policy.apply_edit(&cmd.edit)?;
                    (policy, Some(read_version))
                }
                None => (SafetyPolicy::from_first_edit(cmd.child_id.clone(), &cmd.edit)?, None),
            };

            // 3. Persist, unless someone else wrote first
            if self.policies.save_if_version(&policy, read_version).await? {
                tracing::info!(
                    child_id = %policy.child_id,
                    cloud_version = policy.cloud_version,
                    "Guardrails updated"
                );
                return Ok(policy);
            }

            tracing::debug!(
                child_id = %cmd.child_id,
                attempt,
                "Guardrails changed underneath edit, retrying"
            );
        }

        tracing::warn!(child_id = %cmd.child_id, "Giving up on contended guardrail edit");
        Err(PolicyError::EditConflict(cmd.child_id))
    }
}
