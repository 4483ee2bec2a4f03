//! # Chain Provider
//!
//! The vault never talks to a node directly. Coin selection, fee estimation,
//! submission and finality all go through the [`ChainProvider`] trait so the
//! orchestration logic can run against a real node client or the in-process
//! [`MemoryChain`].
//!
//! Providers are shared behind `Arc<dyn ChainProvider>` by every transfer
//! created from the same vault and must be safe to call concurrently.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::asset::RequiredAmounts;
use crate::error::Result;
use crate::primitives::{Address, TxId};
use crate::transaction::types::{Coin, Policies, SignedTransaction, UnsignedTransaction};

pub use memory::MemoryChain;

// ---------------------------------------------------------------------------
// Fee Estimate
// ---------------------------------------------------------------------------

/// Fee figures returned by the provider for a candidate transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Estimated maximum fee.
    pub max_fee: u64,
    /// Current gas price.
    pub gas_price: u64,
    /// Gas limit the script needs.
    pub gas_limit: u64,
}

impl FeeEstimate {
    /// Converts the estimate into policies, inflating `max_fee` by
    /// `margin_percent`.
    pub fn to_policies(&self, margin_percent: u64) -> Policies {
        let margin = self.max_fee.saturating_mul(margin_percent) / 100;
        Policies {
            max_fee: self.max_fee.saturating_add(margin),
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Finality
// ---------------------------------------------------------------------------

/// What the chain says about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalityOutcome {
    /// Not yet included.
    Pending,
    /// Included and executed successfully.
    Success,
    /// Included and reverted, or dropped.
    Failed(String),
}

impl FinalityOutcome {
    /// Returns `true` for `Success` and `Failed`.
    pub fn is_final(&self) -> bool {
        !matches!(self, FinalityOutcome::Pending)
    }
}

// ---------------------------------------------------------------------------
// Provider Trait
// ---------------------------------------------------------------------------

/// Node-facing operations the vault depends on.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Returns coins owned by `owner` covering `required`, or as much as the
    /// owner holds. Shortfalls are reported by the transaction builder.
    async fn select_spendable_coins(
        &self,
        owner: &Address,
        required: &RequiredAmounts,
    ) -> Result<Vec<Coin>>;

    /// Estimates the fee policies for `tx`.
    async fn estimate_fee(&self, tx: &UnsignedTransaction) -> Result<FeeEstimate>;

    /// Submits a fully witnessed transaction and returns its chain id.
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId>;

    /// Reports the finality of a previously submitted transaction.
    async fn get_finality_result(&self, tx_id: &TxId) -> Result<FinalityOutcome>;
}
