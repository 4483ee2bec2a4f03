//! # Transaction Store
//!
//! The backend keeps the authoritative record of every pending transfer so
//! that signers on different devices converge on the same transaction,
//! witnesses and status. The vault reaches it only through
//! [`TransactionStore`]:
//!
//! ```text
//! memory.rs — MemoryStore: in-process records, optional chain for finality
//! http.rs   — HttpTransactionStore: the REST backend over reqwest
//! record.rs — TransactionRecord and the create payload
//! ```
//!
//! Writes are idempotent where retries are expected: recording the same
//! confirmed witness twice, or marking an already-sent record as sent,
//! changes nothing.

pub mod http;
pub mod memory;
pub mod record;

use async_trait::async_trait;

use crate::error::Result;
use crate::primitives::{Address, TxId};

pub use http::HttpTransactionStore;
pub use memory::MemoryStore;
pub use record::{normalize_hash, CreateTransactionPayload, TransactionRecord};

/// Backend operations on transaction records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a new record and returns it with its assigned id.
    async fn create(&self, draft: CreateTransactionPayload) -> Result<TransactionRecord>;

    /// Fetches a record by backend id.
    async fn find_by_id(&self, id: &str) -> Result<TransactionRecord>;

    /// Fetches a record by identity hash (with or without `0x`).
    async fn find_by_hash(&self, hash: &str) -> Result<TransactionRecord>;

    /// Records a signer's answer and returns the updated record.
    async fn add_witness(
        &self,
        id: &str,
        account: &Address,
        signature: Option<&str>,
        confirm: bool,
    ) -> Result<TransactionRecord>;

    /// Marks the record as submitted under `chain_tx_id`.
    async fn mark_sent(&self, id: &str, chain_tx_id: &TxId) -> Result<TransactionRecord>;

    /// Asks the backend to reconcile the record with chain finality.
    async fn mark_verified(&self, id: &str) -> Result<TransactionRecord>;
}
