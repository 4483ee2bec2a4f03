//! # Transfer Lifecycle
//!
//! A [`Transfer`] tracks one vault transaction from creation to finality:
//!
//! 1. **Collect** -- signers' witnesses arrive through [`Transfer::add_witness`].
//!    Quorum moves the transfer to `PendingSender`.
//! 2. **Send** -- [`Transfer::send`] hands the witnessed transaction to the
//!    chain provider and records the chain id with the backend.
//! 3. **Settle** -- [`Transfer::wait`] polls the backend until the chain
//!    reports success or failure.
//!
//! When a backend record exists it is authoritative: every step re-reads it
//! and adopts whatever another device already did, so the same transfer
//! driven from two places is submitted once. Status never moves backwards
//! and terminal states are immutable.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::status::TransferStatus;
use super::witness::{Witness, WitnessSet};
use crate::asset::{outputs_to_assets, TransferAsset};
use crate::chain::FinalityOutcome;
use crate::config::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::error::{Result, VaultError};
use crate::predicate::Vault;
use crate::primitives::{Address, TxId};
use crate::store::{TransactionRecord, TransactionStore};
use crate::transaction::hasher::{hash_transaction, TransactionIdentity};
use crate::transaction::types::{SignedTransaction, UnsignedTransaction};

// ---------------------------------------------------------------------------
// Transaction Resume
// ---------------------------------------------------------------------------

/// Summary of a transfer handed back by `send` and `wait`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResume {
    /// Backend record id, if the transfer is remote-backed.
    pub id: Option<String>,
    /// Identity hash, hex without `0x`.
    pub hash: String,
    /// Current status.
    pub status: TransferStatus,
    /// Vault the transfer spends from.
    pub predicate_address: Address,
    /// Confirmed signatures, in arrival order.
    pub witnesses: Vec<String>,
    /// Requested transfers, recovered from the coin outputs.
    pub outputs: Vec<TransferAsset>,
    /// Chain transaction id once submitted.
    pub chain_tx_id: Option<TxId>,
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// One vault transaction moving through signature collection and
/// submission.
pub struct Transfer {
    name: String,
    vault: Arc<Vault>,
    transaction: UnsignedTransaction,
    identity: TransactionIdentity,
    witnesses: WitnessSet,
    status: TransferStatus,
    record_id: Option<String>,
    chain_tx_id: Option<TxId>,
    store: Option<Arc<dyn TransactionStore>>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl Transfer {
    /// Creates a local-only transfer for `transaction`.
    ///
    /// # Errors
    /// `UnsupportedFieldKind` if the transaction cannot be hashed.
    pub fn new(
        name: impl Into<String>,
        vault: Arc<Vault>,
        transaction: UnsignedTransaction,
    ) -> Result<Self> {
        let identity = hash_transaction(&transaction)?;
        Ok(Self {
            name: name.into(),
            vault,
            transaction,
            identity,
            witnesses: WitnessSet::new(),
            status: TransferStatus::AwaitingRequirements,
            record_id: None,
            chain_tx_id: None,
            store: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        })
    }

    /// Rebuilds a transfer from a backend record.
    ///
    /// # Errors
    /// `PredicateMismatch` if the record belongs to another vault,
    /// `IdentityMismatch` if its stored hash disagrees with its transaction.
    pub fn from_record(
        vault: Arc<Vault>,
        store: Arc<dyn TransactionStore>,
        record: &TransactionRecord,
    ) -> Result<Self> {
        if &record.predicate_address != vault.address() {
            return Err(VaultError::PredicateMismatch {
                record: record.predicate_address,
                vault: *vault.address(),
            });
        }

        let mut transfer = Self::new(record.name.clone(), vault, record.tx_data.clone())?;
        let stored = crate::store::normalize_hash(&record.hash);
        if stored != transfer.identity.to_hex() {
            warn!(
                id = %record.id,
                stored = %stored,
                computed = %transfer.identity,
                "backend record hash does not match its transaction"
            );
            return Err(VaultError::IdentityMismatch {
                expected: stored,
                actual: transfer.identity.to_hex(),
            });
        }

        transfer.attach(store, record);
        Ok(transfer)
    }

    /// Overrides the polling cadence used by `wait`.
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Binds the transfer to a freshly created backend record.
    pub(crate) fn attach(&mut self, store: Arc<dyn TransactionStore>, record: &TransactionRecord) {
        self.record_id = Some(record.id.clone());
        self.store = Some(store);
        self.merge_record(record);
    }

    // -- accessors ----------------------------------------------------------

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The vault spent from.
    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    /// The unsigned transaction.
    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.transaction
    }

    /// The identity hash.
    pub fn identity(&self) -> &TransactionIdentity {
        &self.identity
    }

    /// The message each signer signs: the identity as hex without `0x`.
    pub fn signing_message(&self) -> String {
        self.identity.to_hex()
    }

    /// Witnesses collected so far.
    pub fn witnesses(&self) -> &WitnessSet {
        &self.witnesses
    }

    /// Current status.
    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// Backend record id, if remote-backed.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Chain transaction id, once submitted.
    pub fn chain_tx_id(&self) -> Option<&TxId> {
        self.chain_tx_id.as_ref()
    }

    /// Returns `true` if a backend record tracks this transfer.
    pub fn is_remote_backed(&self) -> bool {
        self.store.is_some() && self.record_id.is_some()
    }

    /// Returns `true` once confirmed witnesses reach the vault threshold.
    pub fn has_quorum(&self) -> bool {
        self.witnesses.confirmed_count() >= self.vault.threshold()
    }

    /// Current summary.
    pub fn resume(&self) -> TransactionResume {
        TransactionResume {
            id: self.record_id.clone(),
            hash: self.identity.to_hex(),
            status: self.status,
            predicate_address: *self.vault.address(),
            witnesses: self.witnesses.signatures(),
            outputs: outputs_to_assets(&self.transaction.outputs),
            chain_tx_id: self.chain_tx_id,
        }
    }

    // -- witnesses ----------------------------------------------------------

    /// Records `account`'s signature over [`Self::signing_message`].
    ///
    /// Signatures are not checked here; the predicate verifies them on
    /// chain. A repeated confirmation from the same account is a no-op.
    ///
    /// # Errors
    /// `UnknownSigner` if `account` is not one of the vault's signers.
    pub async fn add_witness(
        &mut self,
        account: Address,
        signature: impl Into<String>,
    ) -> Result<TransferStatus> {
        self.record_witness(Witness::confirmed(account, signature)).await
    }

    /// Records that `account` declined to sign. Declines never count
    /// towards quorum, and a confirmation cannot be withdrawn.
    pub async fn decline(&mut self, account: Address) -> Result<TransferStatus> {
        self.record_witness(Witness::declined(account)).await
    }

    async fn record_witness(&mut self, witness: Witness) -> Result<TransferStatus> {
        if !self.vault.config().is_signer(&witness.account) {
            warn!(
                account = %witness.account,
                vault = %self.vault.address(),
                identity = %self.identity,
                "witness from account outside the signer set"
            );
            return Err(VaultError::UnknownSigner(witness.account));
        }

        match self.remote() {
            Some((store, id)) => {
                let record = store
                    .add_witness(
                        &id,
                        &witness.account,
                        witness.signature.as_deref(),
                        witness.confirmed,
                    )
                    .await?;
                self.witnesses.record(witness);
                self.merge_record(&record);
            }
            None => {
                if !self.witnesses.record(witness) {
                    debug!(identity = %self.identity, "duplicate witness ignored");
                }
            }
        }

        self.refresh_quorum();
        Ok(self.status)
    }

    // -- submission ---------------------------------------------------------

    /// Submits the transaction once quorum is reached.
    ///
    /// Already-submitted transfers return their summary without resubmitting.
    /// A remote-backed transfer re-reads its record first and adopts a
    /// submission made elsewhere. A failed submission leaves the transfer in
    /// `PendingSender` so it can be retried.
    ///
    /// # Errors
    /// `NotReady` below quorum, or the chain provider's error.
    pub async fn send(&mut self) -> Result<TransactionResume> {
        if self.status.is_submitted() {
            return Ok(self.resume());
        }

        let remote = self.remote();
        if let Some((store, id)) = &remote {
            let record = store.find_by_id(id).await?;
            self.merge_record(&record);
            if self.status.is_submitted() {
                debug!(id = %id, status = %self.status, "already submitted elsewhere");
                return Ok(self.resume());
            }
        }

        self.refresh_quorum();
        if !self.has_quorum() {
            return Err(VaultError::NotReady {
                have: self.witnesses.confirmed_count(),
                need: self.vault.threshold(),
            });
        }

        let signed = self.signed_transaction();
        let tx_id = match self.vault.chain().submit(&signed).await {
            Ok(tx_id) => tx_id,
            Err(e) => {
                warn!(identity = %self.identity, error = %e, "submission failed");
                return Err(e);
            }
        };

        self.chain_tx_id = Some(tx_id);
        self.advance(TransferStatus::ProcessingOnChain);
        info!(name = %self.name, identity = %self.identity, tx_id = %tx_id, "transfer submitted");

        if let Some((store, id)) = remote {
            let record = store.mark_sent(&id, &tx_id).await?;
            self.merge_record(&record);
        }
        Ok(self.resume())
    }

    /// Witnessed transaction ready for the chain provider.
    pub fn signed_transaction(&self) -> SignedTransaction {
        let mut transaction = self.transaction.clone();
        transaction.witnesses = self.witnesses.signatures();
        SignedTransaction {
            transaction,
            identity: *self.identity.as_bytes32(),
        }
    }

    // -- settlement ---------------------------------------------------------

    /// Reconciles once with the backend record and drives the next step.
    ///
    /// # Errors
    /// `NotRemoteBacked` for local-only transfers.
    pub async fn poll(&mut self) -> Result<TransferStatus> {
        let (store, id) = self.remote().ok_or(VaultError::NotRemoteBacked)?;

        let record = store.find_by_id(&id).await?;
        self.merge_record(&record);

        match record.status {
            TransferStatus::AwaitingRequirements | TransferStatus::PendingSender => {
                if let Some(tx_id) = self.chain_tx_id {
                    let record = store.mark_sent(&id, &tx_id).await?;
                    self.merge_record(&record);
                } else if self.has_quorum() {
                    self.send().await?;
                }
            }
            TransferStatus::ProcessingOnChain => {
                let record = store.mark_verified(&id).await?;
                self.merge_record(&record);
            }
            TransferStatus::Success | TransferStatus::Failed => {}
        }

        debug!(id = %id, status = %self.status, "transfer polled");
        Ok(self.status)
    }

    /// Polls until the transfer is final or the poll timeout elapses.
    pub async fn wait(&mut self) -> Result<TransactionResume> {
        self.wait_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`Self::wait`], stopping early when `token` is cancelled.
    ///
    /// Transport errors from the backend or chain are logged and retried on
    /// the next round. Rejections end the wait.
    ///
    /// # Errors
    /// `NotRemoteBacked`, `Cancelled`, `WaitTimeout`, or a non-transient
    /// error from a poll.
    pub async fn wait_with_cancel(&mut self, token: &CancellationToken) -> Result<TransactionResume> {
        if !self.is_remote_backed() {
            return Err(VaultError::NotRemoteBacked);
        }

        let started = Instant::now();
        loop {
            if token.is_cancelled() {
                return Err(VaultError::Cancelled);
            }

            match self.poll().await {
                Ok(status) if status.is_terminal() => {
                    info!(name = %self.name, status = %status, "transfer settled");
                    return Ok(self.resume());
                }
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    warn!(identity = %self.identity, error = %e, "poll failed, retrying");
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.poll_timeout {
                return Err(VaultError::WaitTimeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                    timeout_ms: self.poll_timeout.as_millis() as u64,
                });
            }
            let delay = self.poll_interval.min(self.poll_timeout - elapsed);

            tokio::select! {
                _ = token.cancelled() => return Err(VaultError::Cancelled),
                _ = sleep(delay) => {}
            }
        }
    }

    /// Asks the chain once for the finality of a submitted transfer.
    ///
    /// Unsubmitted transfers are returned unchanged.
    pub async fn finality(&mut self) -> Result<TransferStatus> {
        let Some(tx_id) = self.chain_tx_id else {
            return Ok(self.status);
        };

        match self.vault.chain().get_finality_result(&tx_id).await? {
            FinalityOutcome::Pending => {}
            FinalityOutcome::Success => self.advance(TransferStatus::Success),
            FinalityOutcome::Failed(reason) => {
                warn!(tx_id = %tx_id, %reason, "transfer failed on chain");
                self.advance(TransferStatus::Failed);
            }
        }
        Ok(self.status)
    }

    // -- internals ----------------------------------------------------------

    fn remote(&self) -> Option<(Arc<dyn TransactionStore>, String)> {
        match (&self.store, &self.record_id) {
            (Some(store), Some(id)) => Some((store.clone(), id.clone())),
            _ => None,
        }
    }

    /// Adopts what the backend knows. Witnesses from accounts outside the
    /// signer set are dropped, and a remote `PendingSender` only counts once
    /// quorum holds locally.
    fn merge_record(&mut self, record: &TransactionRecord) {
        let vault = self.vault.clone();
        let refused = self
            .witnesses
            .merge_where(&record.witnesses, |w| vault.config().is_signer(&w.account));
        for account in refused {
            warn!(
                id = %record.id,
                account = %account,
                vault = %vault.address(),
                "backend record carries a witness from outside the signer set"
            );
        }

        if self.chain_tx_id.is_none() {
            self.chain_tx_id = record.chain_tx_id;
        }
        if record.status != TransferStatus::PendingSender {
            self.advance(record.status);
        }
        self.refresh_quorum();
    }

    fn refresh_quorum(&mut self) {
        if self.status == TransferStatus::AwaitingRequirements && self.has_quorum() {
            self.advance(TransferStatus::PendingSender);
        }
    }

    fn advance(&mut self, next: TransferStatus) {
        if next.rank() <= self.status.rank() {
            return;
        }
        info!(
            name = %self.name,
            identity = %self.identity,
            from = %self.status,
            to = %next,
            "transfer status changed"
        );
        self.status = next;
    }
}

impl std::fmt::Debug for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfer")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("status", &self.status)
            .field("witnesses", &self.witnesses.confirmed_count())
            .field("record_id", &self.record_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{group_by_recipient, TransferAsset};
    use crate::chain::{ChainProvider, MemoryChain};
    use crate::predicate::VaultConfig;
    use crate::primitives::AssetId;
    use crate::store::{CreateTransactionPayload, MemoryStore};
    use crate::transaction::builder::TransactionBuilder;

    const RECIPIENT: Address = Address::new([0xBB; 32]);

    fn signers() -> Vec<Address> {
        (1..=3).map(|i| Address::new([i; 32])).collect()
    }

    async fn setup(threshold: u64) -> (Arc<MemoryChain>, Arc<Vault>, UnsignedTransaction) {
        let chain = Arc::new(MemoryChain::new());
        let config = VaultConfig::new(signers(), threshold).unwrap();
        let vault = Arc::new(Vault::new(config, vec![0xCA, 0xFE], chain.clone()).unwrap());
        chain.fund(*vault.address(), AssetId::ZERO, 1_000);

        let outputs =
            group_by_recipient(&[TransferAsset::new(AssetId::ZERO, RECIPIENT, 100)]).unwrap();
        let builder = TransactionBuilder::for_vault(&vault, AssetId::ZERO)
            .outputs(outputs)
            .fee(1)
            .witness_slots(threshold as usize);
        let required = builder.required_amounts().unwrap();
        let coins = chain
            .select_spendable_coins(vault.address(), &required)
            .await
            .unwrap();
        let tx = builder.coins(coins).build().unwrap();
        (chain, vault, tx)
    }

    async fn remote_transfer(
        store: Arc<MemoryStore>,
        vault: Arc<Vault>,
        tx: UnsignedTransaction,
    ) -> Transfer {
        let mut transfer = Transfer::new("rent", vault.clone(), tx.clone()).unwrap();
        let record = store
            .create(CreateTransactionPayload {
                name: "rent".into(),
                hash: transfer.signing_message(),
                status: TransferStatus::AwaitingRequirements,
                predicate_address: *vault.address(),
                threshold: vault.threshold(),
                assets: outputs_to_assets(&tx.outputs),
                witnesses: WitnessSet::new(),
                tx_data: tx,
            })
            .await
            .unwrap();
        transfer.attach(store, &record);
        transfer
    }

    #[tokio::test]
    async fn unknown_signer_rejected() {
        let (_, vault, tx) = setup(2).await;
        let mut transfer = Transfer::new("t", vault, tx).unwrap();
        let stranger = Address::new([0xEE; 32]);
        let err = transfer.add_witness(stranger, "sig").await.unwrap_err();
        assert!(matches!(err, VaultError::UnknownSigner(a) if a == stranger));
        assert!(transfer.witnesses().is_empty());
    }

    #[tokio::test]
    async fn quorum_reached_at_threshold() {
        let (_, vault, tx) = setup(2).await;
        let mut transfer = Transfer::new("t", vault, tx).unwrap();
        let s = signers();

        assert_eq!(
            transfer.add_witness(s[0], "a").await.unwrap(),
            TransferStatus::AwaitingRequirements
        );
        assert_eq!(
            transfer.add_witness(s[0], "a").await.unwrap(),
            TransferStatus::AwaitingRequirements
        );
        assert_eq!(
            transfer.add_witness(s[1], "b").await.unwrap(),
            TransferStatus::PendingSender
        );
    }

    #[tokio::test]
    async fn declines_do_not_count() {
        let (_, vault, tx) = setup(1).await;
        let mut transfer = Transfer::new("t", vault, tx).unwrap();
        let s = signers();
        transfer.decline(s[0]).await.unwrap();
        assert!(!transfer.has_quorum());
        assert!(matches!(
            transfer.send().await,
            Err(VaultError::NotReady { have: 0, need: 1 })
        ));
    }

    #[tokio::test]
    async fn local_send_and_finality() {
        let (chain, vault, tx) = setup(1).await;
        let mut transfer = Transfer::new("t", vault, tx).unwrap();
        transfer.add_witness(signers()[2], "c").await.unwrap();

        let resume = transfer.send().await.unwrap();
        assert_eq!(resume.status, TransferStatus::ProcessingOnChain);
        assert!(resume.chain_tx_id.is_some());
        assert_eq!(resume.witnesses, vec!["c".to_string()]);
        assert_eq!(chain.submitted()[0].transaction.witnesses, vec!["c".to_string()]);

        let again = transfer.send().await.unwrap();
        assert_eq!(again.chain_tx_id, resume.chain_tx_id);
        assert_eq!(chain.submitted().len(), 1);

        assert_eq!(transfer.finality().await.unwrap(), TransferStatus::Success);
        assert_eq!(chain.balance(&RECIPIENT, &AssetId::ZERO), 100);
    }

    #[tokio::test]
    async fn failed_submission_stays_pending_sender() {
        let (chain, vault, tx) = setup(1).await;
        let mut transfer = Transfer::new("t", vault, tx).unwrap();
        transfer.add_witness(signers()[0], "a").await.unwrap();

        chain.fail_next_submit("node busy");
        assert!(matches!(transfer.send().await, Err(VaultError::Chain(_))));
        assert_eq!(transfer.status(), TransferStatus::PendingSender);

        transfer.send().await.unwrap();
        assert_eq!(transfer.status(), TransferStatus::ProcessingOnChain);
    }

    #[tokio::test]
    async fn poll_requires_backend() {
        let (_, vault, tx) = setup(1).await;
        let mut transfer = Transfer::new("t", vault, tx).unwrap();
        assert!(matches!(transfer.poll().await, Err(VaultError::NotRemoteBacked)));
        assert!(matches!(transfer.wait().await, Err(VaultError::NotRemoteBacked)));
    }

    #[tokio::test]
    async fn remote_witnesses_are_forwarded() {
        let (_, vault, tx) = setup(2).await;
        let store = Arc::new(MemoryStore::new());
        let mut transfer = remote_transfer(store.clone(), vault, tx).await;
        let s = signers();

        transfer.add_witness(s[0], "a").await.unwrap();
        transfer.add_witness(s[1], "b").await.unwrap();

        let record = store.find_by_id(transfer.record_id().unwrap()).await.unwrap();
        assert_eq!(record.witnesses.confirmed_count(), 2);
        assert_eq!(record.status, TransferStatus::PendingSender);
        assert_eq!(transfer.status(), TransferStatus::PendingSender);
    }

    #[tokio::test]
    async fn send_adopts_submission_made_elsewhere() {
        let (chain, vault, tx) = setup(1).await;
        let store = Arc::new(MemoryStore::new());
        let mut transfer = remote_transfer(store.clone(), vault, tx).await;
        transfer.add_witness(signers()[0], "a").await.unwrap();

        let id = transfer.record_id().unwrap().to_string();
        store
            .mark_sent(&id, &crate::primitives::Bytes32::new([0x77; 32]))
            .await
            .unwrap();

        let resume = transfer.send().await.unwrap();
        assert_eq!(resume.status, TransferStatus::ProcessingOnChain);
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_when_chain_never_settles() {
        let (chain, vault, tx) = setup(1).await;
        chain.set_pending_rounds(u32::MAX);
        let store = Arc::new(MemoryStore::with_chain(chain.clone()));
        let mut transfer = remote_transfer(store, vault, tx)
            .await
            .with_polling(Duration::from_millis(100), Duration::from_millis(450));
        transfer.add_witness(signers()[0], "a").await.unwrap();

        let err = transfer.wait().await.unwrap_err();
        assert!(matches!(err, VaultError::WaitTimeout { timeout_ms: 450, .. }));
        assert_eq!(chain.submitted().len(), 1);
    }

    #[tokio::test]
    async fn wait_honours_cancellation() {
        let (_, vault, tx) = setup(2).await;
        let store = Arc::new(MemoryStore::new());
        let mut transfer = remote_transfer(store, vault, tx).await;

        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            transfer.wait_with_cancel(&token).await,
            Err(VaultError::Cancelled)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_retries_failed_submission() {
        let (chain, vault, tx) = setup(1).await;
        let store = Arc::new(MemoryStore::with_chain(chain.clone()));
        let mut transfer = remote_transfer(store, vault, tx)
            .await
            .with_polling(Duration::from_millis(10), Duration::from_secs(5));
        transfer.add_witness(signers()[0], "a").await.unwrap();

        chain.fail_next_submit("mempool full");
        let resume = transfer.wait().await.unwrap();
        assert_eq!(resume.status, TransferStatus::Success);
        assert_eq!(chain.submitted().len(), 1);
    }
}
