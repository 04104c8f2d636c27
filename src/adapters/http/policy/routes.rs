//! Axum router configuration for policy endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_effective_policy, get_guardrails, get_public_key, push_policy, update_guardrails,
};
use crate::adapters::http::state::AppState;

/// Authenticated policy routes, mounted under `/api`.
pub fn policy_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/children/:child_id/guardrails",
            get(get_guardrails).put(update_guardrails),
        )
        .route(
            "/children/:child_id/guardrails/effective-policy",
            get(get_effective_policy),
        )
        .route("/devices/:device_id/policy/push", post(push_policy))
}

/// Unauthenticated key distribution, mounted under `/api`.
pub fn public_key_routes() -> Router<AppState> {
    Router::new().route("/policy/public-key", get(get_public_key))
}
