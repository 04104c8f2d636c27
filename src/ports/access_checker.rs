//! Access control port for child-scoped operator actions.
//!
//! Which accounts may act for which children is owned by the account store
//! outside this service. The pipeline only asks one question of it.
//!
//! # Design
//!
//! Callers treat any error as a denial (fail-secure).
//!
//! # Example
//!
//! ```ignore
//! async fn load_guardrails(
//!     access: &dyn AccessChecker,
//!     user: &AuthenticatedUser,
//!     child_id: &ChildId,
//! ) -> Result<SafetyPolicy, DomainError> {
//!     if !access.can_access_child(&user.id, child_id).await? {
//!         return Err(DomainError::new(ErrorCode::Forbidden, "Access denied"));
//!     }
//!     // ... load the policy
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{ChildId, DomainError, UserId};

/// Answers "may this account act for this child?".
#[async_trait]
pub trait AccessChecker: Send + Sync {
    async fn can_access_child(&self, user_id: &UserId, child_id: &ChildId) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FixedAccess(HashSet<(String, String)>);

    #[async_trait]
    impl AccessChecker for FixedAccess {
        async fn can_access_child(&self, user_id: &UserId, child_id: &ChildId) -> Result<bool, DomainError> {
            Ok(self
                .0
                .contains(&(user_id.to_string(), child_id.to_string())))
        }
    }

    #[tokio::test]
    async fn access_is_per_account_and_child() {
        let mut grants = HashSet::new();
        grants.insert(("parent-1".to_string(), "child-1".to_string()));
        let checker = FixedAccess(grants);

        let parent = UserId::new("parent-1").unwrap();
        let stranger = UserId::new("parent-2").unwrap();
        let child = ChildId::new("child-1").unwrap();

        assert!(checker.can_access_child(&parent, &child).await.unwrap());
        assert!(!checker.can_access_child(&stranger, &child).await.unwrap());
    }
}
