//! # Predicate Vaults
//!
//! A vault is a predicate: a chain address whose spending condition is a
//! fixed program checking `threshold` signatures from a fixed signer set.
//! Nothing about a vault is secret. Its address is a pure function of its
//! [`VaultConfig`], so any party holding the config can re-derive it and
//! verify that coins really sit behind the expected quorum.
//!
//! ```text
//! config.rs   — VaultConfig: signer slots, threshold, predicate code id
//! address.rs  — canonical configurable encoding and address derivation
//! vault.rs    — Vault: config + cached address + predicate bytecode + chain
//! ```

pub mod address;
pub mod config;
pub mod vault;

pub use address::{configurable_bytes, derive_address};
pub use config::VaultConfig;
pub use vault::Vault;
