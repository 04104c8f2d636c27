//! HTTP adapter for guardrail and policy endpoints.
//!
//! - `GET /api/policy/public-key` - Public half of the policy signing key
//! - `GET /api/children/:childId/guardrails` - Stored policy (defaults created on first read)
//! - `PUT /api/children/:childId/guardrails` - Partial guardrail edit
//! - `GET /api/children/:childId/guardrails/effective-policy` - Signed document
//! - `POST /api/devices/:deviceId/policy/push` - Compile, sign and publish

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{policy_routes, public_key_routes};
