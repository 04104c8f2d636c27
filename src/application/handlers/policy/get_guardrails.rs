//! GetGuardrailsHandler - reads a child's policy, creating the defaults.

use std::sync::Arc;

use super::{ensure_child_access, PolicyError};
use crate::domain::foundation::{ChildId, UserId};
use crate::domain::policy::SafetyPolicy;
use crate::ports::{AccessChecker, SafetyPolicyRepository};

#[derive(Debug, Clone)]
pub struct GetGuardrailsQuery {
    pub user_id: UserId,
    pub child_id: ChildId,
}

pub struct GetGuardrailsHandler {
    access: Arc<dyn AccessChecker>,
    policies: Arc<dyn SafetyPolicyRepository>,
}

impl GetGuardrailsHandler {
    pub fn new(access: Arc<dyn AccessChecker>, policies: Arc<dyn SafetyPolicyRepository>) -> Self {
        Self { access, policies }
    }

    /// Returns the stored policy. A child without one gets the defaults
    /// persisted first, so the returned versions are real.
    pub async fn handle(&self, query: GetGuardrailsQuery) -> Result<SafetyPolicy, PolicyError> {
        ensure_child_access(self.access.as_ref(), &query.user_id, &query.child_id).await?;

        if let Some(policy) = self.policies.find_by_child(&query.child_id).await? {
            return Ok(policy);
        }

        let policy = SafetyPolicy::with_defaults(query.child_id);
        if self.policies.save_if_version(&policy, None).await? {
            tracing::info!(child_id = %policy.child_id, "Created default safety policy");
            return Ok(policy);
        }

        // A concurrent edit created the row first; its version wins.
        self.policies
            .find_by_child(&policy.child_id)
            .await?
            .ok_or(PolicyError::PolicyNotFound(policy.child_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::DomainError;
    use crate::domain::policy::{AgeRating, GuardrailEdit};

    /// Misses the row on the first read, as if an edit landed right after it.
    struct LateRowStore {
        inner: Arc<InMemoryStore>,
        missed: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl SafetyPolicyRepository for LateRowStore {
        async fn find_by_child(&self, child_id: &ChildId) -> Result<Option<SafetyPolicy>, DomainError> {
            if !self.missed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_child(child_id).await
        }

        async fn upsert(&self, policy: &SafetyPolicy) -> Result<(), DomainError> {
            self.inner.upsert(policy).await
        }

        async fn save_if_version(
            &self,
            policy: &SafetyPolicy,
            expected_version: Option<u32>,
        ) -> Result<bool, DomainError> {
            self.inner.save_if_version(policy, expected_version).await
        }

        async fn record_device_version(
            &self,
            child_id: &ChildId,
            version: u32,
        ) -> Result<Option<SafetyPolicy>, DomainError> {
            self.inner.record_device_version(child_id, version).await
        }
    }

    fn parent() -> UserId {
        UserId::new("parent-1").unwrap()
    }

    fn child() -> ChildId {
        ChildId::new("child-1").unwrap()
    }

    async fn setup() -> (GetGuardrailsHandler, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store.grant_child_access(parent(), child()).await;
        (GetGuardrailsHandler::new(store.clone(), store.clone()), store)
    }

    #[tokio::test]
    async fn missing_policy_is_created_with_defaults() {
        let (handler, store) = setup().await;

        let policy = handler
            .handle(GetGuardrailsQuery { user_id: parent(), child_id: child() })
            .await
            .unwrap();

        assert_eq!(policy.age_rating, AgeRating::G);
        assert_eq!(policy.cloud_version, 1);
        assert_eq!(policy.device_version, 0);
        assert!(store.find_by_child(&child()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stranger_is_denied() {
        let (handler, store) = setup().await;

        let result = handler
            .handle(GetGuardrailsQuery {
                user_id: UserId::new("parent-2").unwrap(),
                child_id: child(),
            })
            .await;

        assert!(matches!(result, Err(PolicyError::ChildAccessDenied(_))));
        assert!(store.find_by_child(&child()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn defaults_never_overwrite_a_concurrent_edit() {
        let store = Arc::new(InMemoryStore::new());
        store.grant_child_access(parent(), child()).await;
        let edited = SafetyPolicy::from_first_edit(
            child(),
            &GuardrailEdit {
                age_rating: Some(AgeRating::PG),
                ..Default::default()
            },
        )
        .unwrap();
        store.upsert(&edited).await.unwrap();
        let handler = GetGuardrailsHandler::new(
            store.clone(),
            Arc::new(LateRowStore {
                inner: store.clone(),
                missed: std::sync::atomic::AtomicBool::new(false),
            }),
        );

        let policy = handler
            .handle(GetGuardrailsQuery { user_id: parent(), child_id: child() })
            .await
            .unwrap();

        assert_eq!(policy.age_rating, AgeRating::PG);
        let stored = store.find_by_child(&child()).await.unwrap().unwrap();
        assert_eq!(stored.age_rating, AgeRating::PG);
    }
}
