//! Ed25519 policy signer.
//!
//! Holds the process-wide signing key. Key material is either supplied by
//! configuration or, when absent, generated at startup and logged once so an
//! operator can persist it. A generated key dies with the process and every
//! document it signed becomes unverifiable after a restart.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::policy::{
    canonical::to_canonical_bytes, PolicyDocument, PolicySignature, SignedPolicyDocument,
    SIGNATURE_ALGORITHM, SIGNATURE_FIELD,
};
use crate::ports::{PolicySigner, PublicKeyInfo, SignerError};

/// Bytes of the public key hashed into a derived key id.
const KEY_ID_FINGERPRINT_BYTES: usize = 8;

/// Key material as supplied by configuration. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct KeyMaterial {
    /// Base64 of a 32-byte seed or a 64-byte seed‖public keypair.
    pub secret_key: Option<SecretString>,
    /// Base64 public key; must match the one derived from `secret_key`.
    pub public_key: Option<String>,
    pub key_id: Option<String>,
}

/// Where the active key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Configured,
    Generated,
}

struct ActiveKey {
    signing: SigningKey,
    verifying: VerifyingKey,
    key_id: String,
    source: KeySource,
}

/// `PolicySigner` backed by `ed25519-dalek`.
///
/// Starts uninitialized; `initialize` installs the key exactly once.
/// Repeating `initialize` with the same material, or with none, is a no-op.
/// Repeating it with different material is an error.
#[derive(Default)]
pub struct Ed25519PolicySigner {
    key: OnceLock<ActiveKey>,
}

impl Ed25519PolicySigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and initializes a signer in one step.
    pub fn from_material(material: &KeyMaterial) -> Result<Self, SignerError> {
        let signer = Self::new();
        signer.initialize(material)?;
        Ok(signer)
    }

    /// Installs the signing key.
    pub fn initialize(&self, material: &KeyMaterial) -> Result<KeySource, SignerError> {
        let configured = material
            .secret_key
            .as_ref()
            .map(|secret| load_signing_key(secret, material.public_key.as_deref()))
            .transpose()?;

        if let Some(active) = self.key.get() {
            return match configured {
                Some(key) if !same_key(&key, &active.signing) => {
                    Err(SignerError::ConflictingKeyMaterial)
                }
                _ => Ok(active.source),
            };
        }

        let (signing, source) = match configured {
            Some(key) => (key, KeySource::Configured),
            None => (SigningKey::generate(&mut OsRng), KeySource::Generated),
        };
        let verifying = signing.verifying_key();
        let key_id = material
            .key_id
            .clone()
            .unwrap_or_else(|| fingerprint(&verifying));

        if source == KeySource::Generated {
            tracing::warn!(
                key_id = %key_id,
                public_key = %STANDARD.encode(verifying.as_bytes()),
                secret_key = %STANDARD.encode(signing.to_keypair_bytes()),
                "Generated temporary Ed25519 policy signing key; set TOYLINK__SIGNING__SECRET_KEY \
                 and TOYLINK__SIGNING__PUBLIC_KEY to keep it across restarts"
            );
        } else {
            tracing::info!(key_id = %key_id, "Policy signer initialized with configured key");
        }

        let candidate = ActiveKey {
            signing,
            verifying,
            key_id,
            source,
        };
        if let Err(candidate) = self.key.set(candidate) {
            // Lost a race with another initializer; the installed key wins.
            let installed = self.key.get().ok_or(SignerError::NotInitialized)?;
            if source == KeySource::Configured && !same_key(&candidate.signing, &installed.signing) {
                return Err(SignerError::ConflictingKeyMaterial);
            }
            return Ok(installed.source);
        }
        Ok(source)
    }

    pub fn is_initialized(&self) -> bool {
        self.key.get().is_some()
    }

    fn active(&self) -> Result<&ActiveKey, SignerError> {
        self.key.get().ok_or(SignerError::NotInitialized)
    }
}

fn load_signing_key(secret: &SecretString, public: Option<&str>) -> Result<SigningKey, SignerError> {
    let bytes = STANDARD
        .decode(secret.expose_secret().trim())
        .map_err(|e| SignerError::InvalidKeyMaterial(format!("secret key is not base64: {}", e)))?;

    let key = match bytes.len() {
        SECRET_KEY_LENGTH => {
            let mut seed = [0u8; SECRET_KEY_LENGTH];
            seed.copy_from_slice(&bytes);
            SigningKey::from_bytes(&seed)
        }
        KEYPAIR_LENGTH => {
            let mut pair = [0u8; KEYPAIR_LENGTH];
            pair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&pair).map_err(|e| {
                SignerError::InvalidKeyMaterial(format!("keypair halves do not match: {}", e))
            })?
        }
        other => {
            return Err(SignerError::InvalidKeyMaterial(format!(
                "secret key must be {} or {} bytes, got {}",
                SECRET_KEY_LENGTH, KEYPAIR_LENGTH, other
            )))
        }
    };

    if let Some(public) = public {
        let expected = STANDARD.decode(public.trim()).map_err(|e| {
            SignerError::InvalidKeyMaterial(format!("public key is not base64: {}", e))
        })?;
        if !bool::from(expected.as_slice().ct_eq(key.verifying_key().as_bytes())) {
            return Err(SignerError::InvalidKeyMaterial(
                "public key does not match secret key".to_string(),
            ));
        }
    }

    Ok(key)
}

fn same_key(a: &SigningKey, b: &SigningKey) -> bool {
    bool::from(a.to_bytes()[..].ct_eq(&b.to_bytes()[..]))
}

/// Short hex fingerprint of the public key.
fn fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest[..KEY_ID_FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl PolicySigner for Ed25519PolicySigner {
    fn sign(&self, document: PolicyDocument) -> Result<SignedPolicyDocument, SignerError> {
        let active = self.active()?;
        let message = document.canonical_bytes()?;
        let signature = active.signing.sign(&message);

        Ok(SignedPolicyDocument {
            document,
            signature: Some(PolicySignature {
                alg: SIGNATURE_ALGORITHM.to_string(),
                key_id: Some(active.key_id.clone()),
                sig_base64: STANDARD.encode(signature.to_bytes()),
            }),
        })
    }

    fn verify(&self, signed: &Value) -> Result<bool, SignerError> {
        let active = self.active()?;

        let mut unsigned = signed
            .as_object()
            .cloned()
            .ok_or_else(|| SignerError::MalformedDocument("expected a JSON object".to_string()))?;

        let signature = match unsigned.remove(SIGNATURE_FIELD) {
            None | Some(Value::Null) => return Ok(false),
            Some(raw) => serde_json::from_value::<PolicySignature>(raw)
                .map_err(|e| SignerError::MalformedDocument(format!("signature record: {}", e)))?,
        };

        let unsigned = Value::Object(unsigned);
        serde_json::from_value::<PolicyDocument>(unsigned.clone())
            .map_err(|e| SignerError::MalformedDocument(e.to_string()))?;

        if signature.alg != SIGNATURE_ALGORITHM {
            return Ok(false);
        }
        let Ok(sig_bytes) = STANDARD.decode(signature.sig_base64.trim()) else {
            return Ok(false);
        };
        let Ok(sig) = Signature::from_slice(&sig_bytes) else {
            return Ok(false);
        };

        let message = to_canonical_bytes(&unsigned);
        Ok(active.verifying.verify_strict(&message, &sig).is_ok())
    }

    fn public_key(&self) -> Result<PublicKeyInfo, SignerError> {
        let active = self.active()?;
        Ok(PublicKeyInfo {
            alg: SIGNATURE_ALGORITHM.to_string(),
            key_id: Some(active.key_id.clone()),
            public_key_base64: STANDARD.encode(active.verifying.as_bytes()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ChildId, DeviceId, Timestamp};
    use crate::domain::policy::{GuardrailEdit, SafetyPolicy};
    use serde_json::json;

    fn signer() -> Ed25519PolicySigner {
        Ed25519PolicySigner::from_material(&KeyMaterial::default()).unwrap()
    }

    fn document() -> PolicyDocument {
        let child = ChildId::new("child-1").unwrap();
        let edit = GuardrailEdit {
            blocked_keywords: Some(vec!["monster".into()]),
            quiet_start_min: Some(1260),
            quiet_end_min: Some(420),
            ..Default::default()
        };
        let policy = SafetyPolicy::from_first_edit(child.clone(), &edit).unwrap();
        PolicyDocument::compile(
            Some(&policy),
            &child,
            Some(&DeviceId::new("toy-demo-001").unwrap()),
            Timestamp::now(),
        )
    }

    fn material_for(key: &SigningKey) -> KeyMaterial {
        KeyMaterial {
            secret_key: Some(SecretString::new(STANDARD.encode(key.to_bytes()))),
            public_key: Some(STANDARD.encode(key.verifying_key().as_bytes())),
            key_id: Some("test-key".to_string()),
        }
    }

    #[test]
    fn signed_document_verifies() {
        let signer = signer();
        let signed = signer.sign(document()).unwrap();
        let value = signed.to_value().unwrap();

        assert!(signer.verify(&value).unwrap());
        assert_eq!(value["signature"]["alg"], "Ed25519");
    }

    #[test]
    fn verification_survives_reordered_keys() {
        let signer = signer();
        let text = signer.sign(document()).unwrap().to_value().unwrap().to_string();
        let reparsed: Value = serde_json::from_str(&text).unwrap();

        assert!(signer.verify(&reparsed).unwrap());
    }

    #[test]
    fn any_field_change_breaks_verification() {
        let signer = signer();
        let value = signer.sign(document()).unwrap().to_value().unwrap();

        let mutations: Vec<(&str, Value)> = vec![
            ("version", json!(99)),
            ("ageRating", json!("PG13")),
            ("blockedKeywords", json!([])),
            ("deviceId", json!("toy-other")),
            ("issuedAt", json!("2030-01-01T00:00:00.000Z")),
        ];
        for (field, replacement) in mutations {
            let mut tampered = value.clone();
            tampered[field] = replacement;
            assert!(!signer.verify(&tampered).unwrap(), "{} tamper went unnoticed", field);
        }

        let mut added = value.clone();
        added["dailyMinutesMax"] = json!(600);
        assert!(!signer.verify(&added).unwrap());
    }

    #[test]
    fn missing_signature_is_false_not_error() {
        let signer = signer();
        let unsigned = serde_json::to_value(document()).unwrap();
        assert!(!signer.verify(&unsigned).unwrap());
    }

    #[test]
    fn garbage_signature_is_false_not_error() {
        let signer = signer();
        let mut value = signer.sign(document()).unwrap().to_value().unwrap();
        value["signature"]["sigBase64"] = json!("not base64!");
        assert!(!signer.verify(&value).unwrap());

        value["signature"]["sigBase64"] = json!(STANDARD.encode([0u8; 64]));
        assert!(!signer.verify(&value).unwrap());
    }

    #[test]
    fn non_document_input_is_an_error() {
        let signer = signer();
        assert!(matches!(
            signer.verify(&json!([1, 2, 3])),
            Err(SignerError::MalformedDocument(_))
        ));
        assert!(matches!(
            signer.verify(&json!({"signature": {"alg": "Ed25519", "sigBase64": "AA=="}})),
            Err(SignerError::MalformedDocument(_))
        ));
    }

    #[test]
    fn another_key_does_not_verify() {
        let value = signer().sign(document()).unwrap().to_value().unwrap();
        assert!(!signer().verify(&value).unwrap());
    }

    #[test]
    fn uninitialized_signer_refuses_to_sign() {
        let signer = Ed25519PolicySigner::new();
        assert!(matches!(signer.sign(document()), Err(SignerError::NotInitialized)));
        assert!(matches!(signer.public_key(), Err(SignerError::NotInitialized)));
    }

    #[test]
    fn configured_seed_and_keypair_forms_are_equivalent() {
        let key = SigningKey::generate(&mut OsRng);
        let from_seed = Ed25519PolicySigner::from_material(&material_for(&key)).unwrap();

        let pair_material = KeyMaterial {
            secret_key: Some(SecretString::new(STANDARD.encode(key.to_keypair_bytes()))),
            public_key: None,
            key_id: None,
        };
        let from_pair = Ed25519PolicySigner::from_material(&pair_material).unwrap();

        assert_eq!(
            from_seed.public_key().unwrap().public_key_base64,
            from_pair.public_key().unwrap().public_key_base64
        );
        let signed = from_seed.sign(document()).unwrap().to_value().unwrap();
        assert!(from_pair.verify(&signed).unwrap());
    }

    #[test]
    fn mismatched_public_key_is_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let mut material = material_for(&key);
        material.public_key = Some(STANDARD.encode(other.verifying_key().as_bytes()));

        assert!(matches!(
            Ed25519PolicySigner::from_material(&material),
            Err(SignerError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn initialize_is_idempotent_for_same_material() {
        let key = SigningKey::generate(&mut OsRng);
        let signer = Ed25519PolicySigner::new();

        assert_eq!(signer.initialize(&material_for(&key)).unwrap(), KeySource::Configured);
        assert_eq!(signer.initialize(&material_for(&key)).unwrap(), KeySource::Configured);
        assert_eq!(signer.initialize(&KeyMaterial::default()).unwrap(), KeySource::Configured);
    }

    #[test]
    fn initialize_rejects_conflicting_material() {
        let signer = Ed25519PolicySigner::new();
        signer
            .initialize(&material_for(&SigningKey::generate(&mut OsRng)))
            .unwrap();

        let result = signer.initialize(&material_for(&SigningKey::generate(&mut OsRng)));
        assert!(matches!(result, Err(SignerError::ConflictingKeyMaterial)));
    }

    #[test]
    fn generated_key_gets_fingerprint_id() {
        let info = signer().public_key().unwrap();
        let key_id = info.key_id.unwrap();
        assert_eq!(key_id.len(), KEY_ID_FINGERPRINT_BYTES * 2);
        assert!(key_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_secret_is_invalid() {
        let material = KeyMaterial {
            secret_key: Some(SecretString::new(STANDARD.encode([1u8; 16]))),
            ..Default::default()
        };
        assert!(matches!(
            Ed25519PolicySigner::from_material(&material),
            Err(SignerError::InvalidKeyMaterial(_))
        ));
    }
}
