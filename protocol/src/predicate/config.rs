//! Vault configuration: who signs and how many signatures are needed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_NETWORK_URL, MAX_SIGNERS};
use crate::error::{Result, VaultError};
use crate::primitives::{Address, Bytes32};

/// Immutable configuration of a predicate vault.
///
/// Signers occupy fixed slots; unused slots hold [`Address::ZERO`]. Slot
/// order is semantic: permuting signers produces a different predicate
/// address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    signers: [Address; MAX_SIGNERS],
    threshold: u64,
    predicate_code: Option<Bytes32>,
    network: String,
    chain_id: u64,
}

impl VaultConfig {
    /// Creates and validates a configuration.
    ///
    /// # Errors
    /// `InvalidConfig` if the threshold is zero or exceeds the signer count,
    /// there are more than [`MAX_SIGNERS`] signers, or a signer repeats.
    pub fn new(signers: Vec<Address>, threshold: u64) -> Result<Self> {
        if signers.len() > MAX_SIGNERS {
            return Err(VaultError::InvalidConfig(format!(
                "{} signers exceed the {} available slots",
                signers.len(),
                MAX_SIGNERS
            )));
        }

        let mut slots = [Address::ZERO; MAX_SIGNERS];
        slots[..signers.len()].copy_from_slice(&signers);

        let config = Self {
            signers: slots,
            threshold,
            predicate_code: None,
            network: DEFAULT_NETWORK_URL.to_string(),
            chain_id: 0,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the predicate code identifier (hash of the predicate binary).
    pub fn with_predicate_code(mut self, code: Bytes32) -> Self {
        self.predicate_code = Some(code);
        self
    }

    /// Sets the target network endpoint and chain id.
    pub fn with_network(mut self, network: impl Into<String>, chain_id: u64) -> Self {
        self.network = network.into();
        self.chain_id = chain_id;
        self
    }

    /// Checks the invariants `new` enforces. Deserialized configs bypass
    /// `new`, so derivation calls this again.
    pub fn validate(&self) -> Result<()> {
        let count = self.signer_count();
        if self.threshold == 0 {
            return Err(VaultError::InvalidConfig(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.threshold as usize > count {
            return Err(VaultError::InvalidConfig(format!(
                "threshold {} exceeds signer count {}",
                self.threshold, count
            )));
        }

        let mut seen = HashSet::with_capacity(count);
        for signer in self.signers() {
            if !seen.insert(*signer) {
                return Err(VaultError::InvalidConfig(format!(
                    "duplicate signer {}",
                    signer
                )));
            }
        }
        Ok(())
    }

    /// The full slot array, sentinels included.
    pub fn slots(&self) -> &[Address; MAX_SIGNERS] {
        &self.signers
    }

    /// Configured (non-sentinel) signers in slot order.
    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.signers.iter().filter(|a| !a.is_zero())
    }

    /// Number of configured signers.
    pub fn signer_count(&self) -> usize {
        self.signers().count()
    }

    /// Returns `true` if `account` is one of the configured signers.
    pub fn is_signer(&self, account: &Address) -> bool {
        !account.is_zero() && self.signers.contains(account)
    }

    /// Minimum confirmed witnesses required.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Predicate code identifier, if any.
    pub fn predicate_code(&self) -> Option<&Bytes32> {
        self.predicate_code.as_ref()
    }

    /// Network endpoint the vault lives on.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Chain id the vault lives on.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Description like `"2-of-3"`.
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.signer_count())
    }
}
