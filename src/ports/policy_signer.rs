//! Policy signing port.
//!
//! The signer owns one keypair for the life of the process. Callers get it
//! injected; nothing reads key material from shared state.
//!
//! # Contract
//!
//! - `sign` serializes the document canonically and attaches a detached
//!   signature.
//! - `verify` strips the signature, re-serializes canonically and checks it.
//!   A missing or wrong signature is `Ok(false)`; only input that is not a
//!   policy document at all is an error.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::policy::{PolicyDocument, SignedPolicyDocument};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("policy signer is not initialized")]
    NotInitialized,

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("signer already initialized with different key material")]
    ConflictingKeyMaterial,

    #[error("malformed policy document: {0}")]
    MalformedDocument(String),

    #[error("failed to serialize policy document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SignerError> for DomainError {
    fn from(err: SignerError) -> Self {
        DomainError::new(ErrorCode::SigningError, err.to_string())
    }
}

/// Public half of the signing key, as published to devices and operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    pub public_key_base64: String,
}

pub trait PolicySigner: Send + Sync {
    fn sign(&self, document: PolicyDocument) -> Result<SignedPolicyDocument, SignerError>;

    fn verify(&self, signed: &Value) -> Result<bool, SignerError>;

    fn public_key(&self) -> Result<PublicKeyInfo, SignerError>;
}
