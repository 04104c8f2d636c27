//! Safety policies and the signed documents distributed to devices.

pub mod canonical;
mod document;
mod safety_policy;

pub use document::{
    PolicyDocument, PolicySignature, SignedPolicyDocument, POLICY_SCHEMA_VERSION,
    SIGNATURE_ALGORITHM, SIGNATURE_FIELD, UNKNOWN_DEVICE,
};
pub use safety_policy::{AgeRating, GuardrailEdit, QuietHours, SafetyPolicy, MAX_MINUTE_OF_DAY};
