//! In-process transaction store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::record::{normalize_hash, CreateTransactionPayload, TransactionRecord};
use super::TransactionStore;
use crate::chain::{ChainProvider, FinalityOutcome};
use crate::error::{Result, VaultError};
use crate::primitives::{Address, TxId};
use crate::transfer::status::TransferStatus;
use crate::transfer::witness::Witness;

/// Records kept in a map behind a lock.
///
/// Mirrors the backend's own bookkeeping: reaching the threshold moves a
/// record to `PENDING_SENDER`, and `mark_verified` consults the chain when
/// one is attached.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, TransactionRecord>>,
    chain: Option<Arc<dyn ChainProvider>>,
}

impl MemoryStore {
    /// Creates an empty store that never resolves finality on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that resolves finality through `chain`.
    pub fn with_chain(chain: Arc<dyn ChainProvider>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            chain: Some(chain),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Overwrites the stored hash of a record. Simulates a backend that
    /// returns data inconsistent with its transaction.
    #[cfg(any(test, feature = "test-util"))]
    #[doc(hidden)]
    pub fn tamper_hash(&self, id: &str, hash: &str) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        record.hash = hash.to_string();
        Ok(())
    }

    fn update<F>(&self, id: &str, f: F) -> Result<TransactionRecord>
    where
        F: FnOnce(&mut TransactionRecord) -> bool,
    {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        if f(record) {
            record.updated_at = Utc::now();
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn create(&self, draft: CreateTransactionPayload) -> Result<TransactionRecord> {
        let hash = normalize_hash(&draft.hash);
        let mut records = self.records.write();
        if records.values().any(|r| normalize_hash(&r.hash) == hash) {
            return Err(VaultError::BackendRejected(format!(
                "transaction {} already exists",
                hash
            )));
        }

        let now = Utc::now();
        let mut record = TransactionRecord {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            hash,
            status: draft.status,
            predicate_address: draft.predicate_address,
            threshold: draft.threshold,
            assets: draft.assets,
            witnesses: draft.witnesses,
            tx_data: draft.tx_data,
            chain_tx_id: None,
            created_at: now,
            updated_at: now,
        };
        if record.status == TransferStatus::AwaitingRequirements && record.has_quorum() {
            record.status = TransferStatus::PendingSender;
        }

        info!(id = %record.id, hash = %record.hash, status = %record.status, "record created");
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> Result<TransactionRecord> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))
    }

    async fn find_by_hash(&self, hash: &str) -> Result<TransactionRecord> {
        let wanted = normalize_hash(hash);
        self.records
            .read()
            .values()
            .find(|r| normalize_hash(&r.hash) == wanted)
            .cloned()
            .ok_or_else(|| VaultError::RecordNotFound(hash.to_string()))
    }

    async fn add_witness(
        &self,
        id: &str,
        account: &Address,
        signature: Option<&str>,
        confirm: bool,
    ) -> Result<TransactionRecord> {
        let witness = match (confirm, signature) {
            (true, Some(sig)) => Witness::confirmed(*account, sig),
            (true, None) => {
                return Err(VaultError::BackendRejected(
                    "confirmation requires a signature".to_string(),
                ))
            }
            (false, _) => Witness::declined(*account),
        };

        self.update(id, |record| {
            let changed = record.witnesses.record(witness);
            if record.status == TransferStatus::AwaitingRequirements && record.has_quorum() {
                record.status = TransferStatus::PendingSender;
                debug!(id = %record.id, "record reached quorum");
            }
            changed
        })
    }

    async fn mark_sent(&self, id: &str, chain_tx_id: &TxId) -> Result<TransactionRecord> {
        self.update(id, |record| {
            if record.status.is_submitted() {
                return false;
            }
            record.status = TransferStatus::ProcessingOnChain;
            record.chain_tx_id = Some(*chain_tx_id);
            true
        })
    }

    async fn mark_verified(&self, id: &str) -> Result<TransactionRecord> {
        let record = self.find_by_id(id).await?;
        let (chain, tx_id) = match (&self.chain, record.chain_tx_id) {
            (Some(chain), Some(tx_id)) if record.status == TransferStatus::ProcessingOnChain => {
                (chain.clone(), tx_id)
            }
            _ => return Ok(record),
        };

        let outcome = chain.get_finality_result(&tx_id).await?;
        let next = match outcome {
            FinalityOutcome::Pending => return Ok(record),
            FinalityOutcome::Success => TransferStatus::Success,
            FinalityOutcome::Failed(reason) => {
                info!(id, %reason, "transaction failed on chain");
                TransferStatus::Failed
            }
        };

        self.update(id, |record| {
            if record.status != TransferStatus::ProcessingOnChain {
                return false;
            }
            record.status = next;
            true
        })
    }
}
