//! Policy signing key configuration

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Ed25519 key material for policy signatures.
///
/// When no secret key is configured a fresh keypair is generated at startup
/// and logged, which is only acceptable outside production.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningConfig {
    /// Base64 of a 32-byte seed or a 64-byte seed‖public keypair
    pub secret_key: Option<SecretString>,

    /// Base64 public key, checked against the secret key
    pub public_key: Option<String>,

    /// Identifier published next to signatures; derived from the key if unset
    pub key_id: Option<String>,
}

impl SigningConfig {
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.secret_key.is_none() && self.public_key.is_some() {
            return Err(ValidationError::PublicKeyWithoutSecret);
        }
        if *environment == Environment::Production && self.secret_key.is_none() {
            return Err(ValidationError::SigningKeyRequired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_allowed_outside_production() {
        let config = SigningConfig::default();
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Staging).is_ok());
    }

    #[test]
    fn test_production_requires_key_material() {
        let config = SigningConfig::default();
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::SigningKeyRequired)
        );

        let config = SigningConfig {
            secret_key: Some(SecretString::new("c2VlZA==".to_string())),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Production).is_ok());
    }

    #[test]
    fn test_public_key_alone_is_rejected() {
        let config = SigningConfig {
            public_key: Some("cHVi".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::PublicKeyWithoutSecret)
        );
    }
}
