//! Axum router configuration for device endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_device_health, pair_device, send_command};
use crate::adapters::http::state::AppState;

/// Authenticated device routes, mounted under `/api`.
pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/devices/pair", post(pair_device))
        .route("/devices/:device_id/commands", post(send_command))
        .route("/devices/:device_id/health", get(get_device_health))
}
