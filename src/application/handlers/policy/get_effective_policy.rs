//! GetEffectivePolicyHandler - the signed document a child's device would get.

use std::sync::Arc;

use super::{ensure_child_access, PolicyCompiler, PolicyError};
use crate::domain::foundation::{ChildId, UserId};
use crate::domain::policy::SignedPolicyDocument;
use crate::ports::{AccessChecker, DeviceRepository, SafetyPolicyRepository};

#[derive(Debug, Clone)]
pub struct GetEffectivePolicyQuery {
    pub user_id: UserId,
    pub child_id: ChildId,
}

pub struct GetEffectivePolicyHandler {
    access: Arc<dyn AccessChecker>,
    policies: Arc<dyn SafetyPolicyRepository>,
    devices: Arc<dyn DeviceRepository>,
    compiler: PolicyCompiler,
}

impl GetEffectivePolicyHandler {
    pub fn new(
        access: Arc<dyn AccessChecker>,
        policies: Arc<dyn SafetyPolicyRepository>,
        devices: Arc<dyn DeviceRepository>,
        compiler: PolicyCompiler,
    ) -> Self {
        Self {
            access,
            policies,
            devices,
            compiler,
        }
    }

    /// Compiles for the child's first paired device, or `unknown` when there
    /// is none. Nothing is persisted.
    pub async fn handle(
        &self,
        query: GetEffectivePolicyQuery,
    ) -> Result<SignedPolicyDocument, PolicyError> {
        ensure_child_access(self.access.as_ref(), &query.user_id, &query.child_id).await?;

        let policy = self.policies.find_by_child(&query.child_id).await?;
        let devices = self.devices.list_for_child(&query.child_id).await?;
        let device_id = devices.first().map(|d| &d.id);

        Ok(self
            .compiler
            .compile(policy.as_ref(), &query.child_id, device_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::signing::{Ed25519PolicySigner, KeyMaterial};
    use crate::domain::device::Device;
    use crate::domain::foundation::DeviceId;
    use crate::domain::policy::{AgeRating, GuardrailEdit, SafetyPolicy, UNKNOWN_DEVICE};
    use crate::ports::PolicySigner;

    fn parent() -> UserId {
        UserId::new("parent-1").unwrap()
    }

    fn child() -> ChildId {
        ChildId::new("child-1").unwrap()
    }

    fn query() -> GetEffectivePolicyQuery {
        GetEffectivePolicyQuery {
            user_id: parent(),
            child_id: child(),
        }
    }

    async fn setup() -> (GetEffectivePolicyHandler, Arc<InMemoryStore>, Arc<Ed25519PolicySigner>) {
        let store = Arc::new(InMemoryStore::new());
        store.grant_child_access(parent(), child()).await;
        let signer = Arc::new(Ed25519PolicySigner::from_material(&KeyMaterial::default()).unwrap());
        let handler = GetEffectivePolicyHandler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            PolicyCompiler::new(signer.clone()),
        );
        (handler, store, signer)
    }

    #[tokio::test]
    async fn child_without_policy_or_device_gets_signed_defaults() {
        let (handler, _store, signer) = setup().await;

        let signed = handler.handle(query()).await.unwrap();

        assert_eq!(signed.document.device_id, UNKNOWN_DEVICE);
        assert_eq!(signed.document.version, 1);
        assert_eq!(signed.document.age_rating, AgeRating::G);
        assert!(signer.verify(&signed.to_value().unwrap()).unwrap());
    }

    #[tokio::test]
    async fn stored_policy_targets_first_device() {
        let (handler, store, _signer) = setup().await;
        let edit = GuardrailEdit {
            age_rating: Some(AgeRating::PG13),
            ..Default::default()
        };
        store
            .upsert(&SafetyPolicy::from_first_edit(child(), &edit).unwrap())
            .await
            .unwrap();
        store
            .save(&Device::paired(
                DeviceId::new("toy-demo-001").unwrap(),
                parent(),
                Some(child()),
            ))
            .await
            .unwrap();

        let signed = handler.handle(query()).await.unwrap();

        assert_eq!(signed.document.device_id, "toy-demo-001");
        assert_eq!(signed.document.age_rating, AgeRating::PG13);
    }
}
