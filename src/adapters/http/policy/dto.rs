//! HTTP DTOs for policy endpoints.

use serde::Serialize;

use crate::domain::policy::SignedPolicyDocument;

/// Response for a successful policy push.
#[derive(Debug, Clone, Serialize)]
pub struct PushPolicyResponse {
    pub success: bool,
    /// The signed document exactly as published.
    pub policy: SignedPolicyDocument,
}
