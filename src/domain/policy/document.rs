//! The policy document devices receive on `policy/apply`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::canonical::to_canonical_bytes;
use super::safety_policy::{AgeRating, QuietHours, SafetyPolicy};
use crate::domain::foundation::{ChildId, DeviceId, Timestamp};

/// Wire schema version stamped into every document.
pub const POLICY_SCHEMA_VERSION: u8 = 1;

/// The only signature algorithm devices accept.
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

/// Field holding the detached signature; stripped before verification.
pub const SIGNATURE_FIELD: &str = "signature";

/// Placeholder device id used when a child has no device yet.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Unsigned, canonical form of a child's policy for one device.
///
/// Optional fields are omitted rather than serialized as `null`, so a device
/// re-serializing what it received gets the signed bytes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub schema_version: u8,
    pub version: u32,
    pub device_id: String,
    pub child_id: String,
    pub age_rating: AgeRating,
    pub blocked_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_minutes_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    pub issued_at: String,
}

impl PolicyDocument {
    /// Builds the document for `child_id` on `device_id`.
    ///
    /// A child without a stored policy gets the defaults: rated `G`, nothing
    /// blocked, version 1.
    pub fn compile(
        policy: Option<&SafetyPolicy>,
        child_id: &ChildId,
        device_id: Option<&DeviceId>,
        issued_at: Timestamp,
    ) -> Self {
        let device_id = device_id
            .map(|d| d.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_DEVICE.to_string());

        match policy {
            Some(p) => Self {
                schema_version: POLICY_SCHEMA_VERSION,
                version: p.cloud_version.max(1),
                device_id,
                child_id: child_id.as_str().to_string(),
                age_rating: p.age_rating,
                blocked_keywords: p.blocked_keywords.clone(),
                allowed_topics: p.allowed_topics.clone(),
                disallowed_topics: p.disallowed_topics.clone(),
                quiet_hours: p.quiet_hours(),
                daily_minutes_max: p.daily_minutes_max.filter(|m| *m > 0),
                custom_instructions: p
                    .custom_instructions
                    .clone()
                    .filter(|s| !s.is_empty()),
                issued_at: issued_at.to_rfc3339(),
            },
            None => Self {
                schema_version: POLICY_SCHEMA_VERSION,
                version: 1,
                device_id,
                child_id: child_id.as_str().to_string(),
                age_rating: AgeRating::G,
                blocked_keywords: Vec::new(),
                allowed_topics: None,
                disallowed_topics: None,
                quiet_hours: None,
                daily_minutes_max: None,
                custom_instructions: None,
                issued_at: issued_at.to_rfc3339(),
            },
        }
    }

    /// The exact bytes a signature covers.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        Ok(to_canonical_bytes(&serde_json::to_value(self)?))
    }
}

/// Detached signature record attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySignature {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    pub sig_base64: String,
}

/// A policy document with its signature, as published to devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPolicyDocument {
    #[serde(flatten)]
    pub document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<PolicySignature>,
}

impl SignedPolicyDocument {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::GuardrailEdit;

    fn child() -> ChildId {
        ChildId::new("child-1").unwrap()
    }

    fn device() -> DeviceId {
        DeviceId::new("toy-demo-001").unwrap()
    }

    #[test]
    fn missing_policy_compiles_to_defaults() {
        let doc = PolicyDocument::compile(None, &child(), Some(&device()), Timestamp::now());

        assert_eq!(doc.schema_version, 1);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.age_rating, AgeRating::G);
        assert!(doc.blocked_keywords.is_empty());
        assert_eq!(doc.device_id, "toy-demo-001");
    }

    #[test]
    fn unset_optionals_are_omitted_not_null() {
        let doc = PolicyDocument::compile(None, &child(), Some(&device()), Timestamp::now());
        let json = serde_json::to_value(&doc).unwrap();
        let obj = json.as_object().unwrap();

        for key in [
            "allowedTopics",
            "disallowedTopics",
            "quietHours",
            "dailyMinutesMax",
            "customInstructions",
        ] {
            assert!(!obj.contains_key(key), "{} should be omitted", key);
        }
        assert_eq!(json["blockedKeywords"], serde_json::json!([]));
    }

    #[test]
    fn stored_policy_fields_are_echoed() {
        let edit = GuardrailEdit {
            age_rating: Some(AgeRating::PG),
            blocked_keywords: Some(vec!["monster".into()]),
            quiet_start_min: Some(1260),
            quiet_end_min: Some(420),
            daily_minutes_max: Some(45),
            ..Default::default()
        };
        let mut policy = SafetyPolicy::from_first_edit(child(), &edit).unwrap();
        policy.apply_edit(&GuardrailEdit::default()).unwrap();

        let doc = PolicyDocument::compile(Some(&policy), &child(), Some(&device()), Timestamp::now());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(doc.version, 2);
        assert_eq!(json["ageRating"], "PG");
        assert_eq!(json["quietHours"]["startMin"], 1260);
        assert_eq!(json["quietHours"]["endMin"], 420);
        assert_eq!(json["dailyMinutesMax"], 45);
    }

    #[test]
    fn child_without_device_targets_unknown() {
        let doc = PolicyDocument::compile(None, &child(), None, Timestamp::now());
        assert_eq!(doc.device_id, UNKNOWN_DEVICE);
    }

    #[test]
    fn signed_document_flattens_fields() {
        let doc = PolicyDocument::compile(None, &child(), Some(&device()), Timestamp::now());
        let signed = SignedPolicyDocument {
            document: doc,
            signature: Some(PolicySignature {
                alg: SIGNATURE_ALGORITHM.to_string(),
                key_id: None,
                sig_base64: "AAAA".to_string(),
            }),
        };

        let json = signed.to_value().unwrap();
        assert_eq!(json["childId"], "child-1");
        assert_eq!(json["signature"]["alg"], "Ed25519");
        assert!(json["signature"].get("keyId").is_none());

        let back: SignedPolicyDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, signed);
    }
}
