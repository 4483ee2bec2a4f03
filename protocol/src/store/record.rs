//! Backend record shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::TransferAsset;
use crate::error::{Result, VaultError};
use crate::primitives::{Address, TxId};
use crate::transaction::hasher::TransactionIdentity;
use crate::transaction::types::UnsignedTransaction;
use crate::transfer::status::TransferStatus;
use crate::transfer::witness::WitnessSet;

/// The authoritative backend view of a pending transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Backend id (a UUID).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Identity hash, hex without `0x`.
    pub hash: String,
    /// Lifecycle status.
    pub status: TransferStatus,
    /// Vault the transfer spends from.
    pub predicate_address: Address,
    /// Confirmed witnesses needed before the transfer may be sent.
    pub threshold: usize,
    /// Requested transfers.
    pub assets: Vec<TransferAsset>,
    /// Signer answers so far.
    #[serde(default)]
    pub witnesses: WitnessSet,
    /// The unsigned transaction signers approve.
    pub tx_data: UnsignedTransaction,
    /// Chain transaction id once submitted.
    #[serde(default)]
    pub chain_tx_id: Option<TxId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Parses the stored hash.
    pub fn identity(&self) -> Result<TransactionIdentity> {
        self.hash
            .parse::<TransactionIdentity>()
            .map_err(|e| VaultError::Serialization(format!("record hash: {}", e)))
    }

    /// Returns `true` once enough confirmed witnesses are recorded.
    pub fn has_quorum(&self) -> bool {
        self.witnesses.confirmed_count() >= self.threshold
    }
}

/// Draft submitted to create a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionPayload {
    /// Human-readable name.
    pub name: String,
    /// Identity hash, hex without `0x`.
    pub hash: String,
    /// Initial status.
    pub status: TransferStatus,
    /// Vault the transfer spends from.
    pub predicate_address: Address,
    /// Vault threshold.
    pub threshold: usize,
    /// Requested transfers.
    pub assets: Vec<TransferAsset>,
    /// Witnesses already collected locally.
    #[serde(default)]
    pub witnesses: WitnessSet,
    /// The unsigned transaction.
    pub tx_data: UnsignedTransaction,
}

/// Normalizes a hash for comparison: lowercase, no `0x`.
pub fn normalize_hash(hash: &str) -> String {
    hash.trim_start_matches("0x").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_prefix_and_case() {
        assert_eq!(normalize_hash("0xABcd"), "abcd");
        assert_eq!(normalize_hash("abcd"), "abcd");
    }
}
