//! # Transfers
//!
//! Signature collection and submission for vault transactions.
//!
//! ```text
//! status.rs    — TransferStatus and its backend wire names
//! witness.rs   — Witness and the per-account WitnessSet
//! lifecycle.rs — Transfer: add_witness, send, poll, wait
//! ```

pub mod lifecycle;
pub mod status;
pub mod witness;

pub use lifecycle::{TransactionResume, Transfer};
pub use status::TransferStatus;
pub use witness::{Witness, WitnessSet};
