// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Quorum Vault — Core Library
//!
//! Orchestration for multi-signature predicate vaults: a chain address whose
//! spending condition is "`threshold` of these signers agreed". The library
//! builds the transaction, computes the identity every signer signs, collects
//! witnesses, submits once quorum is reached, and reconciles with a backend
//! record so that signers on different devices converge on one transfer.
//!
//! ## Architecture
//!
//! - **primitives** — 32-byte identifiers and hex encoding.
//! - **crypto** — SHA-256 helpers.
//! - **asset** — Grouping requested movements into outputs and requirements.
//! - **predicate** — Vault configuration, address derivation, the `Vault`.
//! - **transaction** — Transaction shapes, the builder, the identity hash.
//! - **transfer** — Witness collection and the submission lifecycle.
//! - **chain** — The chain provider seam, plus an in-memory chain.
//! - **store** — The backend record seam: in-memory and REST stores.
//! - **auth** — Backend session credentials.
//! - **client** — `VaultClient`, the entry point for callers.
//! - **config** — Protocol constants and `ClientConfig`.
//! - **logging** — `tracing` subscriber setup for embedding binaries.
//!
//! ## Design Philosophy
//!
//! 1. The identity hash is the contract between signers. Anything that could
//!    change what they approved is rejected, never skipped.
//! 2. The backend record is authoritative; the chain is final.
//! 3. No hidden retries, no unbounded waits.
//! 4. If it touches money, it has tests. Plural.

pub mod asset;
pub mod auth;
pub mod chain;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod predicate;
pub mod primitives;
pub mod store;
pub mod transaction;
pub mod transfer;

pub use asset::TransferAsset;
pub use client::{ResumeKey, TransferRequest, VaultClient};
pub use config::ClientConfig;
pub use error::{Result, VaultError};
pub use predicate::{Vault, VaultConfig};
pub use transfer::{TransactionResume, Transfer, TransferStatus};
