//! WebSocket upgrade handler for the realtime operator channel.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Validate the bearer token (header or `token` query parameter)
//! 2. Upgrade to WebSocket
//! 3. Register the connection and join the account room
//! 4. Forward room events and handle client frames until disconnect
//! 5. Unregister the connection

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::domain::foundation::{AuthenticatedUser, DeviceId, Timestamp};
use crate::ports::{DeviceRepository, RealtimeRoom, SessionValidator};

use super::messages::{ClientMessage, ConnectedMessage, ServerMessage, SubscriptionMessage};
use super::rooms::{ClientId, RoomRegistry};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub rooms: Arc<RoomRegistry>,
    pub sessions: Arc<dyn SessionValidator>,
    pub devices: Arc<dyn DeviceRepository>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /realtime`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    State(state): State<WebSocketState>,
) -> Response {
    let Some(token) = bearer_token(&headers, query.token) else {
        return unauthorized("Authentication required");
    };

    let user = match state.sessions.validate(&token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected realtime connection");
            return unauthorized("Invalid token");
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user, state))
}

/// The `Authorization: Bearer` header wins over the query parameter.
fn bearer_token(headers: &HeaderMap, query_token: Option<String>) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
        .or(query_token)
        .filter(|t| !t.is_empty())
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": "UNAUTHENTICATED"
        })),
    )
        .into_response()
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, user: AuthenticatedUser, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let registration = state.rooms.register(&user.id).await;
    let client_id = registration.client_id;
    let outbox = registration.outbox;
    let mut inbox = registration.inbox;

    tracing::debug!(client_id = %client_id, user_id = %user.id, "Realtime client connected");

    let connected = ServerMessage::Connected(ConnectedMessage {
        client_id: client_id.to_string(),
        user_id: user.id.to_string(),
        timestamp: Timestamp::now().to_rfc3339(),
    });
    // Queued ahead of any room event the registry may already have sent.
    if outbox.send(connected).await.is_err() {
        state.rooms.unregister(client_id).await;
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            if let Err(e) = send_message(&mut sender, &msg).await {
                tracing::debug!(client_id = %client_id, error = %e, "Send error, closing connection");
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => handle_client_message(&recv_state, client_id, &user, msg).await,
                        Err(e) => ServerMessage::error("BAD_MESSAGE", e.to_string()),
                    };
                    if outbox.send(reply).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(client_id = %client_id, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(client_id = %client_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(client_id = %client_id, error = %e, "Receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.rooms.unregister(client_id).await;
    tracing::debug!(client_id = %client_id, "Realtime client disconnected");
}

/// Applies one client frame and returns the reply.
async fn handle_client_message(
    state: &WebSocketState,
    client_id: ClientId,
    user: &AuthenticatedUser,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::Ping => ServerMessage::pong(),
        ClientMessage::SubscribeDevice { device_id } => {
            let Ok(id) = DeviceId::new(device_id.clone()) else {
                return ServerMessage::error("INVALID_DEVICE_ID", "deviceId is required");
            };

            match state.devices.find_by_id(&id).await {
                Ok(Some(device)) if device.owner_id == user.id => {
                    state.rooms.join(client_id, RealtimeRoom::Device(id)).await;
                    ServerMessage::Subscribed(SubscriptionMessage { device_id })
                }
                Ok(_) => ServerMessage::error("DEVICE_NOT_FOUND", "Device not found"),
                Err(e) => {
                    tracing::warn!(client_id = %client_id, error = %e, "Device lookup failed");
                    ServerMessage::error("INTERNAL_ERROR", "Could not subscribe")
                }
            }
        }
        ClientMessage::UnsubscribeDevice { device_id } => {
            if let Ok(id) = DeviceId::new(device_id.clone()) {
                state.rooms.leave(client_id, &RealtimeRoom::Device(id)).await;
            }
            ServerMessage::Unsubscribed(SubscriptionMessage { device_id })
        }
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Router for the realtime endpoint.
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new().route("/realtime", get(ws_handler))
}
