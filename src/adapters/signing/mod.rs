//! Policy signing adapters.

mod ed25519;

pub use ed25519::{Ed25519PolicySigner, KeyMaterial, KeySource};
