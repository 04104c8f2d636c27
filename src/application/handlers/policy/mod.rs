//! Policy handlers - guardrail edits and signed policy distribution.

mod compiler;
mod get_effective_policy;
mod get_guardrails;
mod push_policy;
mod update_guardrails;

pub use compiler::PolicyCompiler;
pub use get_effective_policy::{GetEffectivePolicyHandler, GetEffectivePolicyQuery};
pub use get_guardrails::{GetGuardrailsHandler, GetGuardrailsQuery};
pub use push_policy::{PushPolicyCommand, PushPolicyHandler, PushPolicyResult};
pub use update_guardrails::{UpdateGuardrailsCommand, UpdateGuardrailsHandler};

use thiserror::Error;

use crate::domain::foundation::{ChildId, DeviceId, DomainError, UserId, ValidationError};
use crate::ports::{AccessChecker, SignerError, TransportError};

/// Errors from policy operations.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("access to child {0} denied")]
    ChildAccessDenied(ChildId),

    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    #[error("no policy found for child {0}")]
    PolicyNotFound(ChildId),

    #[error("device {0} is not linked to a child")]
    DeviceNotLinked(DeviceId),

    #[error("guardrails for child {0} kept changing during the edit")]
    EditConflict(ChildId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Signing(#[from] SignerError),

    #[error("failed to publish policy: {0}")]
    Publish(#[source] TransportError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Fails unless `user_id` may act for `child_id`.
async fn ensure_child_access(
    access: &dyn AccessChecker,
    user_id: &UserId,
    child_id: &ChildId,
) -> Result<(), PolicyError> {
    if access.can_access_child(user_id, child_id).await? {
        Ok(())
    } else {
        tracing::debug!(user_id = %user_id, child_id = %child_id, "Child access denied");
        Err(PolicyError::ChildAccessDenied(child_id.clone()))
    }
}
