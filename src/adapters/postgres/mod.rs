//! PostgreSQL adapters - Database implementations for the store ports.
//!
//! - `PostgresDeviceRepository` - Devices with store-side staleness guards
//! - `PostgresSafetyPolicyRepository` - Per-child policies and version counters
//! - `PostgresDeviceEventLog` - Append-only device events
//! - `PostgresChatRepository` - Chat sessions and messages
//! - `PostgresAccessChecker` - Account to child links
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod access_checker;
mod chat_repository;
mod convert;
mod device_event_log;
mod device_repository;
mod safety_policy_repository;

pub use access_checker::PostgresAccessChecker;
pub use chat_repository::PostgresChatRepository;
pub use device_event_log::PostgresDeviceEventLog;
pub use device_repository::PostgresDeviceRepository;
pub use safety_policy_repository::PostgresSafetyPolicyRepository;
