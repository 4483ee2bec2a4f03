//! # Vault Client
//!
//! Entry point for callers. A [`VaultClient`] holds the chain provider, the
//! optional backend store and the [`ClientConfig`], and hands out
//! [`Transfer`]s:
//!
//! - [`VaultClient::create_transfer`] builds a new transaction from a list of
//!   requested movements;
//! - [`VaultClient::resume_transfer`] rebuilds one from its backend record,
//!   after checking the record against its own transaction;
//! - [`VaultClient::adopt_raw_transaction`] takes a transaction built
//!   elsewhere and attaches the vault predicate to it.
//!
//! [`VaultClient::transfer`] dispatches a tagged [`TransferRequest`] onto
//! these three.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::asset::{group_by_recipient, outputs_to_assets, TransferAsset};
use crate::chain::ChainProvider;
use crate::config::{ClientConfig, SHORT_ID_MAX_LEN};
use crate::error::{Result, VaultError};
use crate::predicate::{Vault, VaultConfig};
use crate::store::{normalize_hash, CreateTransactionPayload, TransactionStore};
use crate::transaction::builder::{attach_predicate, TransactionBuilder};
use crate::transaction::types::UnsignedTransaction;
use crate::transfer::{Transfer, TransferStatus};

/// Prefix of the name given to transfers created without one.
pub const DEFAULT_TRANSFER_NAME_PREFIX: &str = "Random Vault Name";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Key identifying an existing backend record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeKey {
    /// Backend record id.
    Id(String),
    /// Identity hash.
    Hash(String),
}

impl ResumeKey {
    /// Classifies a bare string: record ids are UUIDs of at most
    /// [`SHORT_ID_MAX_LEN`] characters, anything longer is a hash.
    pub fn parse(key: &str) -> Self {
        if key.len() <= SHORT_ID_MAX_LEN {
            ResumeKey::Id(key.to_string())
        } else {
            ResumeKey::Hash(key.to_string())
        }
    }
}

/// What [`VaultClient::transfer`] should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferRequest {
    /// Resume from a backend record id.
    ResumeById { id: String },
    /// Resume from an identity hash.
    ResumeByHash { hash: String },
    /// Build a new transfer.
    NewFromAssets {
        assets: Vec<TransferAsset>,
        #[serde(default)]
        name: Option<String>,
    },
    /// Take over a transaction built elsewhere.
    AdoptRawTransaction {
        transaction: UnsignedTransaction,
        #[serde(default)]
        persist: bool,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<&str> for TransferRequest {
    fn from(key: &str) -> Self {
        match ResumeKey::parse(key) {
            ResumeKey::Id(id) => TransferRequest::ResumeById { id },
            ResumeKey::Hash(hash) => TransferRequest::ResumeByHash { hash },
        }
    }
}

// ---------------------------------------------------------------------------
// VaultClient
// ---------------------------------------------------------------------------

/// Creates, resumes and adopts vault transfers.
pub struct VaultClient {
    config: ClientConfig,
    chain: Arc<dyn ChainProvider>,
    store: Option<Arc<dyn TransactionStore>>,
}

impl VaultClient {
    /// Creates a client without a backend. Transfers it creates are
    /// local-only.
    ///
    /// # Errors
    /// `InvalidConfig` if `config` fails validation.
    pub fn new(config: ClientConfig, chain: Arc<dyn ChainProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            chain,
            store: None,
        })
    }

    /// Persists transfers to `store`.
    pub fn with_store(mut self, store: Arc<dyn TransactionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Opens a vault on this client's chain.
    ///
    /// # Errors
    /// `InvalidConfig` if `config` targets a network other than
    /// [`ClientConfig::network_url`], or its predicate code does not match
    /// `bytecode`.
    pub fn open_vault(&self, config: VaultConfig, bytecode: Vec<u8>) -> Result<Arc<Vault>> {
        if config.network() != self.config.network_url {
            return Err(VaultError::InvalidConfig(format!(
                "vault targets {}, client is connected to {}",
                config.network(),
                self.config.network_url
            )));
        }
        Ok(Arc::new(Vault::new(config, bytecode, self.chain.clone())?))
    }

    /// Builds a new transfer moving `assets` out of `vault`.
    ///
    /// Coin selection and fee estimation go to the chain provider. When a
    /// store is configured the transfer is persisted before it is returned.
    ///
    /// # Errors
    /// `InsufficientFunds` if the vault cannot cover the transfer plus fee,
    /// or any collaborator error.
    pub async fn create_transfer(
        &self,
        vault: &Arc<Vault>,
        assets: &[TransferAsset],
        name: Option<String>,
    ) -> Result<Transfer> {
        if assets.is_empty() {
            return Err(VaultError::InvalidConfig(
                "transfer must move at least one asset".to_string(),
            ));
        }
        let fee = i64::try_from(self.config.default_fee).map_err(|_| {
            VaultError::InvalidConfig(format!("fee {} out of range", self.config.default_fee))
        })?;

        let builder = TransactionBuilder::for_vault(vault, self.config.base_asset_id)
            .outputs(group_by_recipient(assets)?)
            .fee(fee)
            .witness_slots(vault.threshold());

        let required = builder.required_amounts()?;
        let coins = self
            .chain
            .select_spendable_coins(vault.address(), &required)
            .await?;
        let builder = builder.coins(coins);

        let draft = builder.clone().build()?;
        let estimate = self.chain.estimate_fee(&draft).await?;
        let transaction = builder.estimate(estimate).build()?;

        let name = name.unwrap_or_else(default_name);
        let mut transfer = self.local_transfer(name, vault, transaction)?;
        if self.store.is_some() {
            self.persist(&mut transfer).await?;
        }

        info!(
            name = transfer.name(),
            identity = %transfer.identity(),
            vault = %vault.address(),
            "transfer created"
        );
        Ok(transfer)
    }

    /// Rebuilds a transfer from its backend record.
    ///
    /// # Errors
    /// `NotRemoteBacked` without a store, `RecordNotFound`,
    /// `PredicateMismatch`, or `IdentityMismatch` if the record's hash does
    /// not match its transaction or the hash that was asked for.
    pub async fn resume_transfer(&self, vault: &Arc<Vault>, key: ResumeKey) -> Result<Transfer> {
        let store = self.store.clone().ok_or(VaultError::NotRemoteBacked)?;
        let record = match &key {
            ResumeKey::Id(id) => store.find_by_id(id).await?,
            ResumeKey::Hash(hash) => {
                let record = store.find_by_hash(hash).await?;
                let requested = normalize_hash(hash);
                let returned = normalize_hash(&record.hash);
                if returned != requested {
                    warn!(
                        id = %record.id,
                        %requested,
                        %returned,
                        "backend answered with another record"
                    );
                    return Err(VaultError::IdentityMismatch {
                        expected: requested,
                        actual: returned,
                    });
                }
                record
            }
        };

        let transfer = Transfer::from_record(vault.clone(), store, &record)?
            .with_polling(self.config.poll_interval(), self.config.poll_timeout());
        info!(id = %record.id, status = %transfer.status(), "transfer resumed");
        Ok(transfer)
    }

    /// Takes over a transaction built elsewhere: attaches the vault predicate
    /// to its vault-owned inputs and, if `persist`, stores it.
    ///
    /// # Errors
    /// `NotRemoteBacked` if `persist` is set without a store.
    pub async fn adopt_raw_transaction(
        &self,
        vault: &Arc<Vault>,
        mut transaction: UnsignedTransaction,
        persist: bool,
        name: Option<String>,
    ) -> Result<Transfer> {
        if persist && self.store.is_none() {
            return Err(VaultError::NotRemoteBacked);
        }

        let touched = attach_predicate(
            &mut transaction,
            vault.address(),
            &vault.predicate_bytecode(),
            &vault.predicate_data(),
        );
        let mut transfer = self.local_transfer(name.unwrap_or_else(default_name), vault, transaction)?;
        if persist {
            self.persist(&mut transfer).await?;
        }

        info!(
            identity = %transfer.identity(),
            predicate_inputs = touched,
            persisted = persist,
            "raw transaction adopted"
        );
        Ok(transfer)
    }

    /// Dispatches `request`.
    pub async fn transfer(&self, vault: &Arc<Vault>, request: TransferRequest) -> Result<Transfer> {
        match request {
            TransferRequest::ResumeById { id } => self.resume_transfer(vault, ResumeKey::Id(id)).await,
            TransferRequest::ResumeByHash { hash } => {
                self.resume_transfer(vault, ResumeKey::Hash(hash)).await
            }
            TransferRequest::NewFromAssets { assets, name } => {
                self.create_transfer(vault, &assets, name).await
            }
            TransferRequest::AdoptRawTransaction {
                transaction,
                persist,
                name,
            } => self.adopt_raw_transaction(vault, transaction, persist, name).await,
        }
    }

    fn local_transfer(
        &self,
        name: String,
        vault: &Arc<Vault>,
        transaction: UnsignedTransaction,
    ) -> Result<Transfer> {
        Ok(Transfer::new(name, vault.clone(), transaction)?
            .with_polling(self.config.poll_interval(), self.config.poll_timeout()))
    }

    async fn persist(&self, transfer: &mut Transfer) -> Result<()> {
        let store = self.store.clone().ok_or(VaultError::NotRemoteBacked)?;
        let transaction = transfer.transaction().clone();
        let record = store
            .create(CreateTransactionPayload {
                name: transfer.name().to_string(),
                hash: transfer.signing_message(),
                status: TransferStatus::AwaitingRequirements,
                predicate_address: *transfer.vault().address(),
                threshold: transfer.vault().threshold(),
                assets: outputs_to_assets(&transaction.outputs),
                witnesses: transfer.witnesses().clone(),
                tx_data: transaction,
            })
            .await?;
        transfer.attach(store, &record);
        Ok(())
    }
}

fn default_name() -> String {
    format!("{} - {}", DEFAULT_TRANSFER_NAME_PREFIX, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::primitives::{Address, AssetId, TxId};
    use crate::store::{MemoryStore, TransactionRecord};

    const RECIPIENT: Address = Address::new([0xBB; 32]);

    fn signers() -> Vec<Address> {
        (1..=3).map(|i| Address::new([i; 32])).collect()
    }

    fn setup() -> (Arc<MemoryChain>, VaultClient, Arc<Vault>) {
        let chain = Arc::new(MemoryChain::new());
        let client = VaultClient::new(ClientConfig::default(), chain.clone()).unwrap();
        let vault = client
            .open_vault(VaultConfig::new(signers(), 2).unwrap(), vec![0x01])
            .unwrap();
        chain.fund(*vault.address(), AssetId::ZERO, 500);
        (chain, client, vault)
    }

    #[test]
    fn resume_key_classification() {
        let uuid = Uuid::new_v4().to_string();
        assert_eq!(ResumeKey::parse(&uuid), ResumeKey::Id(uuid.clone()));
        let hash = "ab".repeat(32);
        assert_eq!(ResumeKey::parse(&hash), ResumeKey::Hash(hash.clone()));
        assert!(matches!(
            TransferRequest::from(hash.as_str()),
            TransferRequest::ResumeByHash { .. }
        ));
    }

    #[test]
    fn request_json_is_tagged() {
        let request: TransferRequest =
            serde_json::from_str(r#"{"kind": "resume_by_id", "id": "42"}"#).unwrap();
        assert_eq!(request, TransferRequest::ResumeById { id: "42".into() });
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert!(VaultClient::new(config, Arc::new(MemoryChain::new())).is_err());
    }

    #[tokio::test]
    async fn create_local_transfer() {
        let (_, client, vault) = setup();
        let transfer = client
            .create_transfer(&vault, &[TransferAsset::new(AssetId::ZERO, RECIPIENT, 100)], None)
            .await
            .unwrap();

        assert!(transfer.name().starts_with("Random Vault Name - "));
        assert_eq!(transfer.status(), TransferStatus::AwaitingRequirements);
        assert!(!transfer.is_remote_backed());
        assert_eq!(transfer.transaction().witnesses.len(), 2);
        assert_eq!(transfer.transaction().policies.max_fee, 1);
    }

    #[tokio::test]
    async fn create_fails_when_vault_is_short() {
        let (_, client, vault) = setup();
        let err = client
            .create_transfer(&vault, &[TransferAsset::new(AssetId::ZERO, RECIPIENT, 500)], None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::InsufficientFunds {
                required: 501,
                available: 500,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn empty_transfer_rejected() {
        let (_, client, vault) = setup();
        assert!(client.create_transfer(&vault, &[], None).await.is_err());
    }

    #[tokio::test]
    async fn resume_without_store_is_not_remote_backed() {
        let (_, client, vault) = setup();
        assert!(matches!(
            client.resume_transfer(&vault, ResumeKey::Id("x".into())).await,
            Err(VaultError::NotRemoteBacked)
        ));
    }

    #[tokio::test]
    async fn resume_from_other_vault_rejected() {
        let (chain, client, vault) = setup();
        let client = client.with_store(Arc::new(MemoryStore::new()));
        let transfer = client
            .create_transfer(&vault, &[TransferAsset::new(AssetId::ZERO, RECIPIENT, 10)], None)
            .await
            .unwrap();

        let other = Arc::new(
            Vault::new(VaultConfig::new(signers(), 1).unwrap(), vec![0x01], chain).unwrap(),
        );
        let err = client
            .resume_transfer(&other, ResumeKey::Id(transfer.record_id().unwrap().into()))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::PredicateMismatch { .. }));
    }

    #[test]
    fn vault_on_other_network_rejected() {
        let (_, client, _) = setup();
        let config = VaultConfig::new(signers(), 2)
            .unwrap()
            .with_network("http://testnet:4000/graphql", 9);
        assert!(matches!(
            client.open_vault(config, vec![0x01]),
            Err(VaultError::InvalidConfig(_))
        ));
    }

    /// Answers every hash lookup with the same record.
    struct MisroutedStore {
        inner: Arc<MemoryStore>,
        answer: String,
    }

    #[async_trait::async_trait]
    impl TransactionStore for MisroutedStore {
        async fn create(&self, draft: CreateTransactionPayload) -> Result<TransactionRecord> {
            self.inner.create(draft).await
        }

        async fn find_by_id(&self, id: &str) -> Result<TransactionRecord> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_hash(&self, _hash: &str) -> Result<TransactionRecord> {
            self.inner.find_by_id(&self.answer).await
        }

        async fn add_witness(
            &self,
            id: &str,
            account: &Address,
            signature: Option<&str>,
            confirm: bool,
        ) -> Result<TransactionRecord> {
            self.inner.add_witness(id, account, signature, confirm).await
        }

        async fn mark_sent(&self, id: &str, chain_tx_id: &TxId) -> Result<TransactionRecord> {
            self.inner.mark_sent(id, chain_tx_id).await
        }

        async fn mark_verified(&self, id: &str) -> Result<TransactionRecord> {
            self.inner.mark_verified(id).await
        }
    }

    #[tokio::test]
    async fn resume_by_hash_rejects_a_different_record() {
        let (chain, _, vault) = setup();
        let inner = Arc::new(MemoryStore::new());
        let writer = VaultClient::new(ClientConfig::default(), chain.clone())
            .unwrap()
            .with_store(inner.clone());
        let wanted = writer
            .create_transfer(&vault, &[TransferAsset::new(AssetId::ZERO, RECIPIENT, 10)], None)
            .await
            .unwrap();
        let other = writer
            .create_transfer(&vault, &[TransferAsset::new(AssetId::ZERO, RECIPIENT, 20)], None)
            .await
            .unwrap();

        let reader = VaultClient::new(ClientConfig::default(), chain)
            .unwrap()
            .with_store(Arc::new(MisroutedStore {
                inner,
                answer: other.record_id().unwrap().to_string(),
            }));
        let err = reader
            .resume_transfer(&vault, ResumeKey::Hash(format!("0x{}", wanted.signing_message())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::IdentityMismatch { expected, actual }
                if expected == wanted.signing_message() && actual == other.signing_message()
        ));
    }

    #[tokio::test]
    async fn adopt_attaches_predicate() {
        let (_, client, vault) = setup();
        let local = client
            .create_transfer(&vault, &[TransferAsset::new(AssetId::ZERO, RECIPIENT, 10)], None)
            .await
            .unwrap();
        let mut raw = local.transaction().clone();
        for input in &mut raw.inputs {
            if let crate::transaction::types::Input::Coin { predicate, .. } = input {
                predicate.clear();
            }
        }

        let adopted = client
            .adopt_raw_transaction(&vault, raw, false, Some("imported".into()))
            .await
            .unwrap();
        assert_eq!(adopted.identity(), local.identity());
        assert_eq!(adopted.transaction().inputs, local.transaction().inputs);
        assert_eq!(adopted.name(), "imported");

        assert!(matches!(
            client
                .adopt_raw_transaction(&vault, local.transaction().clone(), true, None)
                .await,
            Err(VaultError::NotRemoteBacked)
        ));
    }
}
