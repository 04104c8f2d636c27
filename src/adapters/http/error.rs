//! Error responses shared by every HTTP endpoint.
//!
//! Handler errors convert into [`ApiError`], which owns the mapping from
//! error kinds to status codes and the JSON body shape.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::handlers::{CommandError, PolicyError};
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// Anything an endpoint can fail with.
#[derive(Debug)]
pub enum ApiError {
    Policy(PolicyError),
    Command(CommandError),
    Domain(DomainError),
    /// A path or body value that failed validation before reaching a handler.
    BadRequest(ValidationError),
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        Self::Policy(err)
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        Self::Command(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err)
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err.code {
        ErrorCode::ValidationFailed | ErrorCode::DeviceNotLinked | ErrorCode::StaleUpdate => {
            StatusCode::BAD_REQUEST
        }
        ErrorCode::DeviceNotFound | ErrorCode::PolicyNotFound | ErrorCode::ChatSessionNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::TransportError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::DatabaseError | ErrorCode::SigningError | ErrorCode::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, String) {
        match self {
            ApiError::Policy(err) => match err {
                PolicyError::ChildAccessDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN".into()),
                PolicyError::DeviceNotFound(_) => {
                    (StatusCode::NOT_FOUND, "DEVICE_NOT_FOUND".into())
                }
                PolicyError::PolicyNotFound(_) => {
                    (StatusCode::NOT_FOUND, "POLICY_NOT_FOUND".into())
                }
                PolicyError::DeviceNotLinked(_) => {
                    (StatusCode::BAD_REQUEST, "DEVICE_NOT_LINKED".into())
                }
                PolicyError::EditConflict(_) => (StatusCode::CONFLICT, "EDIT_CONFLICT".into()),
                PolicyError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_FAILED".into())
                }
                PolicyError::Signing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "SIGNING_ERROR".into())
                }
                PolicyError::Publish(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PUBLISH_FAILED".into())
                }
                PolicyError::Domain(e) => (domain_status(e), e.code.to_string()),
            },
            ApiError::Command(err) => match err {
                CommandError::DeviceNotFound(_) => {
                    (StatusCode::NOT_FOUND, "DEVICE_NOT_FOUND".into())
                }
                CommandError::AlreadyPaired(_) => {
                    (StatusCode::BAD_REQUEST, "DEVICE_ALREADY_PAIRED".into())
                }
                CommandError::ChildAccessDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN".into()),
                CommandError::Publish(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PUBLISH_FAILED".into())
                }
                CommandError::Domain(e) => (domain_status(e), e.code.to_string()),
            },
            ApiError::Domain(e) => (domain_status(e), e.code.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED".into()),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Policy(e) => e.to_string(),
            ApiError::Command(e) => e.to_string(),
            ApiError::Domain(e) => e.message.clone(),
            ApiError::BadRequest(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Internal detail stays in the log, not the response.
        let message = if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code = %code, error = %self.message(), "Request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Device messaging is unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.message()
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
