//! Application layer - handlers that orchestrate domain rules over ports.
//!
//! Write paths (ingestion, guardrail edits, pushes, commands) and read paths
//! (guardrails, effective policy, device health) are separate handlers, each
//! holding only the ports it needs.

pub mod handlers;

pub use handlers::{
    CommandError, DispatchOutcome, IngestOutcome, IngestionDispatcher, IngestionPorts,
    PolicyCompiler, PolicyError, RetryPolicy,
};
