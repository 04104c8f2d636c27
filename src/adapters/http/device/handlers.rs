//! HTTP handlers for device endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    DeviceHealth, GetDeviceHealthQuery, PairDeviceCommand, SendCommandCommand,
};
use crate::domain::device::Device;
use crate::domain::foundation::{ChildId, DeviceId};

use super::dto::{PairDeviceRequest, SendCommandRequest, SendCommandResponse};

/// POST /api/devices/pair
pub async fn pair_device(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<PairDeviceRequest>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let cmd = PairDeviceCommand {
        user_id: user.id,
        device_id: DeviceId::new(req.device_id)?,
        child_id: req.child_id.map(ChildId::new).transpose()?,
    };

    let device = state.pair_device_handler().handle(cmd).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// POST /api/devices/:deviceId/commands
pub async fn send_command(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(device_id): Path<String>,
    Json(req): Json<SendCommandRequest>,
) -> Result<Json<SendCommandResponse>, ApiError> {
    let cmd = SendCommandCommand {
        user_id: user.id,
        device_id: DeviceId::new(device_id)?,
        command_type: req.command_type,
        args: req.args,
    };

    let command = state.send_command_handler().handle(cmd).await?;
    Ok(Json(SendCommandResponse {
        success: true,
        command,
    }))
}

/// GET /api/devices/:deviceId/health
pub async fn get_device_health(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceHealth>, ApiError> {
    let query = GetDeviceHealthQuery {
        user_id: user.id,
        device_id: DeviceId::new(device_id)?,
    };

    let health = state.device_health_handler().handle(query).await?;
    Ok(Json(health))
}
