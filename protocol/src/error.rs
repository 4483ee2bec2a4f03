//! Error types for vault orchestration.
//!
//! Every fallible operation in the crate returns a [`VaultError`]. The enum
//! is exhaustive over the failure modes of building, hashing, collecting
//! witnesses for, and submitting a vault transaction. Collaborator failures
//! (backend, chain) are carried as strings so trait implementations are not
//! forced onto a particular transport's error type.

use thiserror::Error;

use crate::primitives::{Address, AssetId};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while orchestrating a vault transaction.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The vault configuration is malformed. Fatal, never retried.
    #[error("invalid vault config: {0}")]
    InvalidConfig(String),

    /// The selected coins do not cover the amount required for an asset.
    #[error("insufficient funds for asset {asset_id}: required {required}, available {available}")]
    InsufficientFunds {
        /// The asset that is short.
        asset_id: AssetId,
        /// Amount needed (outputs plus fee for the base asset).
        required: u64,
        /// Amount covered by the selected coins.
        available: u64,
    },

    /// The protocol fee passed to aggregation is negative.
    #[error("invalid fee for base asset: {0}")]
    InvalidFeeAsset(i64),

    /// Summing amounts overflowed `u64`.
    #[error("amount overflow while summing asset {0}")]
    AmountOverflow(AssetId),

    /// The transaction contains an input/output kind the identity encoding
    /// cannot represent.
    #[error("unsupported field kind in identity encoding: {0}")]
    UnsupportedFieldKind(String),

    /// A witness arrived from an account outside the vault's signer set.
    #[error("unknown signer: {0}")]
    UnknownSigner(Address),

    /// A remote record's stored hash disagrees with the recomputed identity.
    #[error("identity mismatch: record says {expected}, transaction hashes to {actual}")]
    IdentityMismatch {
        /// Hash stored in the remote record.
        expected: String,
        /// Hash recomputed from the record's transaction data.
        actual: String,
    },

    /// A remote record belongs to a different predicate than the vault.
    #[error("record belongs to predicate {record}, vault is {vault}")]
    PredicateMismatch {
        /// Predicate address stored on the record.
        record: Address,
        /// Address derived for the local vault.
        vault: Address,
    },

    /// The operation needs a backend record but the transfer is local-only.
    #[error("transfer is not backed by a remote record")]
    NotRemoteBacked,

    /// `send` was called before quorum was reached.
    #[error("transfer not ready: {have} of {need} confirmed witnesses")]
    NotReady {
        /// Confirmed witnesses collected.
        have: usize,
        /// Vault threshold.
        need: usize,
    },

    /// `wait` exceeded its configured upper bound.
    #[error("wait timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    WaitTimeout {
        /// Milliseconds elapsed before giving up.
        elapsed_ms: u64,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// `wait` was cancelled by the caller's token.
    #[error("wait cancelled by caller")]
    Cancelled,

    /// The backend has no record for the requested key.
    #[error("transaction record not found: {0}")]
    RecordNotFound(String),

    /// Transport failure talking to the backend store. May succeed on retry.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend refused the request as invalid. Repeating it fails the
    /// same way.
    #[error("backend rejected request: {0}")]
    BackendRejected(String),

    /// Transport failure talking to the chain provider. May succeed on retry.
    #[error("chain error: {0}")]
    Chain(String),

    /// The chain refused the transaction (spent inputs, unbalanced outputs,
    /// unknown id). Resubmitting it fails the same way.
    #[error("chain rejected transaction: {0}")]
    ChainRejected(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}

impl VaultError {
    /// Returns `true` for errors that come from a collaborator's transport
    /// and may succeed on a retry. Rejections are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, VaultError::Backend(_) | VaultError::Chain(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_short_asset() {
        let err = VaultError::InsufficientFunds {
            asset_id: AssetId::ZERO,
            required: 101,
            available: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("required 101"));
        assert!(msg.contains(&AssetId::ZERO.to_string()));
    }

    #[test]
    fn only_collaborator_errors_are_transient() {
        assert!(VaultError::Chain("timeout".into()).is_transient());
        assert!(VaultError::Backend("502".into()).is_transient());
        assert!(!VaultError::NotRemoteBacked.is_transient());
        assert!(!VaultError::InvalidConfig("x".into()).is_transient());
        assert!(!VaultError::ChainRejected("input spent".into()).is_transient());
        assert!(!VaultError::BackendRejected("400".into()).is_transient());
    }
}
