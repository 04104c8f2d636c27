//! HTTP adapters - REST API for operators.
//!
//! - `policy` - guardrails, signed effective policy, push, public key
//! - `device` - pairing, commands, health
//!
//! Everything except `/health` and the public key sits behind
//! [`middleware::auth_middleware`].

pub mod device;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod state;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::domain::foundation::Timestamp;

pub use device::device_routes;
pub use error::{ApiError, ErrorResponse};
pub use middleware::{auth_middleware, AuthState, RequireAuth};
pub use policy::{policy_routes, public_key_routes};
pub use state::AppState;

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Timestamp::now().to_rfc3339(),
    }))
}

/// Builds the REST router: `/health` plus everything under `/api`.
pub fn api_router(state: AppState, sessions: AuthState) -> Router {
    let protected = Router::new()
        .merge(policy_routes())
        .merge(device_routes())
        .layer(axum::middleware::from_fn_with_state(sessions, auth_middleware));

    let api = Router::new().merge(public_key_routes()).merge(protected);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

/// Wraps a router in request tracing, CORS and the request timeout.
pub fn with_http_layers(router: Router, server: &ServerConfig) -> Router {
    router
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::{InMemoryStore, RecordingTransport};
    use crate::adapters::signing::{Ed25519PolicySigner, KeyMaterial};
    use crate::domain::device::Device;
    use crate::domain::foundation::{ChildId, DeviceId, UserId};
    use crate::ports::{DeviceEventLog, DeviceRepository};

    const TOKEN: &str = "parent-token";

    struct Fixture {
        router: Router,
        store: Arc<InMemoryStore>,
        transport: Arc<RecordingTransport>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let parent = UserId::new("parent-1").unwrap();
        store
            .grant_child_access(parent.clone(), ChildId::new("child-1").unwrap())
            .await;
        store
            .save(&Device::paired(
                DeviceId::new("toy-linked").unwrap(),
                parent.clone(),
                Some(ChildId::new("child-1").unwrap()),
            ))
            .await
            .unwrap();
        store
            .save(&Device::paired(DeviceId::new("toy-loose").unwrap(), parent, None))
            .await
            .unwrap();

        let transport = Arc::new(RecordingTransport::new());
        let signer = Arc::new(Ed25519PolicySigner::from_material(&KeyMaterial::default()).unwrap());
        let state = AppState {
            devices: store.clone(),
            policies: store.clone(),
            event_log: store.clone(),
            access: store.clone(),
            transport: transport.clone(),
            signer,
        };
        let sessions: AuthState =
            Arc::new(MockSessionValidator::new().with_test_user(TOKEN, "parent-1"));

        Fixture {
            router: api_router(state, sessions),
            store,
            transport,
        }
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", TOKEN));
        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_is_public() {
        let f = fixture().await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&f.router, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn public_key_needs_no_token() {
        let f = fixture().await;
        let req = Request::builder()
            .uri("/api/policy/public-key")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&f.router, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alg"], "Ed25519");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let f = fixture().await;
        let req = Request::builder()
            .uri("/api/children/child-1/guardrails")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&f.router, req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn guardrails_read_creates_defaults_and_edit_bumps_version() {
        let f = fixture().await;

        let (status, body) = send(&f.router, request("GET", "/api/children/child-1/guardrails", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ageRating"], "G");
        assert_eq!(body["cloudVersion"], 1);

        let edit = json!({"ageRating": "PG", "blockedKeywords": ["scary"]});
        let (status, body) = send(
            &f.router,
            request("PUT", "/api/children/child-1/guardrails", Some(edit)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ageRating"], "PG");
        assert_eq!(body["cloudVersion"], 2);
        assert_eq!(body["deviceVersion"], 0);
    }

    #[tokio::test]
    async fn guardrails_of_unlinked_child_are_forbidden() {
        let f = fixture().await;
        let (status, body) =
            send(&f.router, request("GET", "/api/children/child-9/guardrails", None)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn push_publishes_signed_policy() {
        let f = fixture().await;
        send(&f.router, request("GET", "/api/children/child-1/guardrails", None)).await;

        let (status, body) =
            send(&f.router, request("POST", "/api/devices/toy-linked/policy/push", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["policy"]["signature"]["alg"], "Ed25519");
        assert_eq!(f.transport.published().len(), 1);
    }

    #[tokio::test]
    async fn push_failures_map_to_statuses() {
        let f = fixture().await;

        // No policy stored yet.
        let (status, _) =
            send(&f.router, request("POST", "/api/devices/toy-linked/policy/push", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&f.router, request("POST", "/api/devices/toy-loose/policy/push", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "DEVICE_NOT_LINKED");

        send(&f.router, request("GET", "/api/children/child-1/guardrails", None)).await;
        f.transport.set_connected(false);
        let (status, _) =
            send(&f.router, request("POST", "/api/devices/toy-linked/policy/push", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn command_is_published_and_echoed() {
        let f = fixture().await;
        let body = json!({"type": "say", "args": {"text": "hello"}});

        let (status, resp) = send(
            &f.router,
            request("POST", "/api/devices/toy-loose/commands", Some(body)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["success"], true);
        assert_eq!(resp["command"]["type"], "say");
        assert_eq!(resp["command"]["args"]["text"], "hello");
        assert_eq!(f.transport.published().len(), 1);
    }

    #[tokio::test]
    async fn command_to_unknown_device_is_404() {
        let f = fixture().await;
        let (status, _) = send(
            &f.router,
            request("POST", "/api/devices/toy-ghost/commands", Some(json!({"type": "ping"}))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_returns_device_and_recent_events() {
        let f = fixture().await;
        let device_id = DeviceId::new("toy-loose").unwrap();
        f.store
            .append(&crate::domain::device::DeviceEvent::new(
                device_id,
                crate::domain::device::DeviceEventType::State,
                json!({"online": true}),
            ))
            .await
            .unwrap();

        let (status, body) =
            send(&f.router, request("GET", "/api/devices/toy-loose/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["id"], "toy-loose");
        assert_eq!(body["recentEvents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pairing_twice_is_rejected() {
        let f = fixture().await;
        let body = json!({"deviceId": "toy-new", "childId": "child-1"});

        let (status, created) =
            send(&f.router, request("POST", "/api/devices/pair", Some(body.clone()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], "toy-new");

        let (status, _) = send(&f.router, request("POST", "/api/devices/pair", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cors_layer_accepts_configured_origins() {
        let _ = cors_layer(&[]);
        let _ = cors_layer(&["http://localhost:5173".to_string()]);
    }
}
