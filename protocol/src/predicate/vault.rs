//! A vault bound to a chain provider.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::address::{configurable_bytes, derive_address};
use super::config::VaultConfig;
use crate::chain::ChainProvider;
use crate::crypto::sha256_array;
use crate::error::{Result, VaultError};
use crate::primitives::{Address, Bytes32};

/// A predicate vault: configuration, derived address, predicate bytecode and
/// the chain it lives on.
///
/// The address is derived once at construction and cached. Vaults are
/// immutable and shared behind `Arc` by every transfer they spawn.
pub struct Vault {
    config: VaultConfig,
    address: Address,
    bytecode: Vec<u8>,
    chain: Arc<dyn ChainProvider>,
}

impl Vault {
    /// Builds a vault from its configuration and predicate bytecode template.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration is invalid, or if it names a
    /// predicate code id that is not the SHA-256 of `bytecode`.
    pub fn new(
        config: VaultConfig,
        bytecode: Vec<u8>,
        chain: Arc<dyn ChainProvider>,
    ) -> Result<Self> {
        if let Some(code) = config.predicate_code() {
            let actual = Bytes32::new(sha256_array(&bytecode));
            if &actual != code {
                return Err(VaultError::InvalidConfig(format!(
                    "predicate code id {} does not match bytecode hash {}",
                    code, actual
                )));
            }
        }

        let address = derive_address(&config)?;
        info!(
            address = %address,
            quorum = %config.description(),
            network = config.network(),
            "vault opened"
        );

        Ok(Self {
            config,
            address,
            bytecode,
            chain,
        })
    }

    /// The vault configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The predicate address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Minimum confirmed witnesses required to spend.
    pub fn threshold(&self) -> usize {
        self.config.threshold() as usize
    }

    /// The chain provider this vault spends through.
    pub fn chain(&self) -> &Arc<dyn ChainProvider> {
        &self.chain
    }

    /// Bytecode attached to vault-owned inputs: the template followed by the
    /// configurable block.
    pub fn predicate_bytecode(&self) -> Vec<u8> {
        let mut code = self.bytecode.clone();
        code.extend_from_slice(&configurable_bytes(&self.config));
        code
    }

    /// Predicate input data. The predicate reads witnesses directly, so no
    /// per-input data is needed.
    pub fn predicate_data(&self) -> Vec<u8> {
        Vec::new()
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("config", &self.config)
            .field("bytecode_len", &self.bytecode.len())
            .finish()
    }
}
