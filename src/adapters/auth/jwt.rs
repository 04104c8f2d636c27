//! HS256 JWT adapter for session validation.
//!
//! Operator tokens are minted by the account service with a shared secret and
//! carry `{userId, email, role, exp}`. This adapter checks the signature and
//! expiry and maps the claims to an `AuthenticatedUser`.
//!
//! # Example
//!
//! ```ignore
//! use toylink::adapters::auth::JwtSessionValidator;
//!
//! let validator = JwtSessionValidator::new(config.auth.jwt_secret.clone());
//! let user = validator.validate("eyJ...").await?;
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountRole, AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Claims carried in operator access tokens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorClaims {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: AccountRole,
    /// Expiry (Unix epoch seconds)
    pub exp: i64,
}

fn default_role() -> AccountRole {
    AccountRole::Parent
}

/// Shared-secret JWT validator.
pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(secret: SecretString) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key,
            validation,
        }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<OperatorClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    _ => {
                        tracing::debug!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            },
        )?;

        let claims = data.claims;
        let user_id = UserId::new(claims.user_id).map_err(|_| {
            tracing::warn!("Token has an empty userId claim");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.email, claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-at-least-32-bytes-long!!";

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(SecretString::new(SECRET.to_string()))
    }

    fn token(user_id: &str, exp_offset_secs: i64, secret: &str) -> String {
        let claims = OperatorClaims {
            user_id: user_id.to_string(),
            email: "parent@example.com".to_string(),
            role: AccountRole::Parent,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_maps_claims() {
        let user = validator()
            .validate(&token("parent-1", 3600, SECRET))
            .await
            .unwrap();

        assert_eq!(user.id.as_str(), "parent-1");
        assert_eq!(user.email, "parent@example.com");
        assert_eq!(user.role, AccountRole::Parent);
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let result = validator().validate(&token("parent-1", -3600, SECRET)).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let result = validator()
            .validate(&token("parent-1", 3600, "some-other-secret-that-is-long-enough"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn empty_user_id_is_invalid() {
        let result = validator().validate(&token("", 3600, SECRET)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        let result = validator().validate("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
