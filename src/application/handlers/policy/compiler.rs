//! PolicyCompiler - builds and signs the document a device enforces.

use std::sync::Arc;

use crate::domain::foundation::{ChildId, DeviceId, Timestamp};
use crate::domain::policy::{PolicyDocument, SafetyPolicy, SignedPolicyDocument};
use crate::ports::{PolicySigner, SignerError};

/// Only hands out signed documents.
#[derive(Clone)]
pub struct PolicyCompiler {
    signer: Arc<dyn PolicySigner>,
}

impl PolicyCompiler {
    pub fn new(signer: Arc<dyn PolicySigner>) -> Self {
        Self { signer }
    }

    /// Compiles `policy` (or the defaults when `None`) for `device_id`,
    /// stamped now, and signs it.
    pub fn compile(
        &self,
        policy: Option<&SafetyPolicy>,
        child_id: &ChildId,
        device_id: Option<&DeviceId>,
    ) -> Result<SignedPolicyDocument, SignerError> {
        let document = PolicyDocument::compile(policy, child_id, device_id, Timestamp::now());
        self.signer.sign(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::signing::{Ed25519PolicySigner, KeyMaterial};
    use crate::domain::policy::AgeRating;

    fn signer() -> Arc<Ed25519PolicySigner> {
        Arc::new(Ed25519PolicySigner::from_material(&KeyMaterial::default()).unwrap())
    }

    #[test]
    fn default_policy_is_signed_and_verifiable() {
        let signer = signer();
        let compiler = PolicyCompiler::new(signer.clone());
        let child = ChildId::new("child-1").unwrap();

        let signed = compiler.compile(None, &child, None).unwrap();

        assert_eq!(signed.document.age_rating, AgeRating::G);
        assert!(signed.document.blocked_keywords.is_empty());
        assert!(signed.signature.is_some());
        assert!(signer.verify(&signed.to_value().unwrap()).unwrap());
    }

    #[test]
    fn uninitialized_signer_refuses() {
        let compiler = PolicyCompiler::new(Arc::new(Ed25519PolicySigner::new()));
        let child = ChildId::new("child-1").unwrap();

        let result = compiler.compile(None, &child, None);

        assert!(matches!(result, Err(SignerError::NotInitialized)));
    }
}
