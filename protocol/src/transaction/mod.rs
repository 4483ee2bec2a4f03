//! # Transaction Module
//!
//! Construction and identity hashing for vault transactions. Every transfer
//! out of a vault is an [`UnsignedTransaction`] whose coin inputs carry the
//! vault predicate, and whose [`TransactionIdentity`] is what each signer
//! signs.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   — Input, Output, Policies, UnsignedTransaction, SignedTransaction
//! builder.rs — Fluent TransactionBuilder shaping predicate transactions
//! hasher.rs  — Canonical identity encoding and SHA-256 digest
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** — [`TransactionBuilder`] turns grouped outputs and selected
//!    coins into an unsigned transaction.
//! 2. **Hash** — [`hash_transaction`] computes the identity signers sign.
//! 3. **Collect** — witnesses accumulate on a [`crate::transfer::Transfer`].
//! 4. **Submit** — once quorum is reached the transfer hands a
//!    [`SignedTransaction`] to the chain provider.
//!
//! ## Design Decisions
//!
//! - The identity covers only fields the predicate can observe. Witnesses,
//!   policies and predicate bytecode may change without invalidating
//!   signatures already collected.
//! - All amounts are `u64` in the smallest unit of their asset.

pub mod builder;
pub mod hasher;
pub mod types;

pub use builder::{attach_predicate, TransactionBuilder};
pub use hasher::{hash_transaction, TransactionIdentity};
pub use types::{
    Coin, Input, Output, Policies, SignedTransaction, TransactionType, UnsignedTransaction,
};
