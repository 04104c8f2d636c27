//! HTTP handlers for policy endpoints.

use axum::extract::{Json, Path, State};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    GetEffectivePolicyQuery, GetGuardrailsQuery, PushPolicyCommand, UpdateGuardrailsCommand,
};
use crate::domain::foundation::{ChildId, DeviceId};
use crate::domain::policy::{GuardrailEdit, SafetyPolicy, SignedPolicyDocument};
use crate::ports::PublicKeyInfo;

use super::dto::PushPolicyResponse;

/// GET /api/policy/public-key
pub async fn get_public_key(State(state): State<AppState>) -> Result<Json<PublicKeyInfo>, ApiError> {
    let info = state
        .signer
        .public_key()
        .map_err(crate::domain::foundation::DomainError::from)?;
    Ok(Json(info))
}

/// GET /api/children/:childId/guardrails
pub async fn get_guardrails(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(child_id): Path<String>,
) -> Result<Json<SafetyPolicy>, ApiError> {
    let query = GetGuardrailsQuery {
        user_id: user.id,
        child_id: ChildId::new(child_id)?,
    };

    let policy = state.get_guardrails_handler().handle(query).await?;
    Ok(Json(policy))
}

/// PUT /api/children/:childId/guardrails
pub async fn update_guardrails(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(child_id): Path<String>,
    Json(edit): Json<GuardrailEdit>,
) -> Result<Json<SafetyPolicy>, ApiError> {
    let cmd = UpdateGuardrailsCommand {
        user_id: user.id,
        child_id: ChildId::new(child_id)?,
        edit,
    };

    let policy = state.update_guardrails_handler().handle(cmd).await?;
    Ok(Json(policy))
}

/// GET /api/children/:childId/guardrails/effective-policy
pub async fn get_effective_policy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(child_id): Path<String>,
) -> Result<Json<SignedPolicyDocument>, ApiError> {
    let query = GetEffectivePolicyQuery {
        user_id: user.id,
        child_id: ChildId::new(child_id)?,
    };

    let document = state.effective_policy_handler().handle(query).await?;
    Ok(Json(document))
}

/// POST /api/devices/:deviceId/policy/push
pub async fn push_policy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(device_id): Path<String>,
) -> Result<Json<PushPolicyResponse>, ApiError> {
    let cmd = PushPolicyCommand {
        user_id: user.id,
        device_id: DeviceId::new(device_id)?,
    };

    let result = state.push_policy_handler().handle(cmd).await?;
    Ok(Json(PushPolicyResponse {
        success: true,
        policy: result.policy,
    }))
}
