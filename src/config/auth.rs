//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Secret used when none is configured. Rejected in production.
pub const DEVELOPMENT_JWT_SECRET: &str = "change-me";

/// Authentication configuration (HS256 operator tokens)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret the account service signs access tokens with
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: SecretString,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// In production the development default is refused.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret == DEVELOPMENT_JWT_SECRET {
            return Err(ValidationError::InsecureJwtSecret);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
        }
    }
}

fn default_jwt_secret() -> SecretString {
    SecretString::new(DEVELOPMENT_JWT_SECRET.to_string())
}
