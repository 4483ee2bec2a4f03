//! In-process chain used by tests and local simulations.
//!
//! Holds a UTXO set, applies submitted transactions to it immediately, and
//! reports a scripted finality outcome after a configurable number of
//! `Pending` answers.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{ChainProvider, FeeEstimate, FinalityOutcome};
use crate::asset::RequiredAmounts;
use crate::config::DEFAULT_GAS_LIMIT;
use crate::crypto::Sha256Writer;
use crate::error::{Result, VaultError};
use crate::primitives::{Address, AssetId, Bytes32, TxId, UtxoId};
use crate::transaction::types::{
    Coin, Input, Output, SignedTransaction, UnsignedTransaction,
};

struct Submitted {
    pending_left: u32,
    outcome: FinalityOutcome,
}

struct ChainState {
    coins: Vec<Coin>,
    next_nonce: u64,
    submitted: HashMap<TxId, Submitted>,
    history: Vec<SignedTransaction>,
    fee_estimate: FeeEstimate,
    outcome: FinalityOutcome,
    pending_rounds: u32,
    fail_next_submit: Option<String>,
}

/// A chain living entirely in memory.
pub struct MemoryChain {
    state: Mutex<ChainState>,
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChain {
    /// Creates an empty chain whose transactions all succeed.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                coins: Vec::new(),
                next_nonce: 0,
                submitted: HashMap::new(),
                history: Vec::new(),
                fee_estimate: FeeEstimate {
                    max_fee: 1,
                    gas_price: 1,
                    gas_limit: DEFAULT_GAS_LIMIT,
                },
                outcome: FinalityOutcome::Success,
                pending_rounds: 0,
                fail_next_submit: None,
            }),
        }
    }

    /// Mints a coin of `amount` `asset_id` to `owner`.
    pub fn fund(&self, owner: Address, asset_id: AssetId, amount: u64) -> UtxoId {
        let mut state = self.state.lock();
        let utxo_id = Self::next_utxo(&mut state);
        state.coins.push(Coin {
            utxo_id,
            owner,
            asset_id,
            amount,
        });
        utxo_id
    }

    /// Total unspent `asset_id` held by `owner`.
    pub fn balance(&self, owner: &Address, asset_id: &AssetId) -> u64 {
        self.state
            .lock()
            .coins
            .iter()
            .filter(|c| &c.owner == owner && &c.asset_id == asset_id)
            .map(|c| c.amount)
            .sum()
    }

    /// Sets the estimate returned by `estimate_fee`.
    pub fn set_fee_estimate(&self, estimate: FeeEstimate) {
        self.state.lock().fee_estimate = estimate;
    }

    /// Sets the outcome reported for transactions submitted from now on.
    pub fn set_outcome(&self, outcome: FinalityOutcome) {
        self.state.lock().outcome = outcome;
    }

    /// Number of `Pending` answers before a new submission reports its
    /// outcome.
    pub fn set_pending_rounds(&self, rounds: u32) {
        self.state.lock().pending_rounds = rounds;
    }

    /// Makes the next `submit` fail with `reason`.
    pub fn fail_next_submit(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_submit = Some(reason.into());
    }

    /// Every transaction accepted so far, oldest first.
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().history.clone()
    }

    fn next_utxo(state: &mut ChainState) -> UtxoId {
        let mut w = Sha256Writer::new();
        w.write_bytes(b"memory-chain").write_u64(state.next_nonce);
        state.next_nonce += 1;
        UtxoId::new(Bytes32::new(w.finish()), 0)
    }
}

#[async_trait]
impl ChainProvider for MemoryChain {
    async fn select_spendable_coins(
        &self,
        owner: &Address,
        required: &RequiredAmounts,
    ) -> Result<Vec<Coin>> {
        let state = self.state.lock();
        let mut selected = Vec::new();

        for need in required.iter().filter(|n| n.amount > 0) {
            let mut candidates: Vec<&Coin> = state
                .coins
                .iter()
                .filter(|c| &c.owner == owner && c.asset_id == need.asset_id)
                .collect();
            candidates.sort_by(|a, b| b.amount.cmp(&a.amount));

            let mut covered = 0u64;
            for coin in candidates {
                if covered >= need.amount {
                    break;
                }
                covered = covered.saturating_add(coin.amount);
                selected.push(coin.clone());
            }
        }

        debug!(owner = %owner, coins = selected.len(), "coins selected");
        Ok(selected)
    }

    async fn estimate_fee(&self, _tx: &UnsignedTransaction) -> Result<FeeEstimate> {
        Ok(self.state.lock().fee_estimate)
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<TxId> {
        let mut state = self.state.lock();

        if let Some(reason) = state.fail_next_submit.take() {
            warn!(identity = %signed.identity, %reason, "submission failed");
            return Err(VaultError::Chain(reason));
        }

        let tx = &signed.transaction;
        let mut spent: Vec<usize> = Vec::new();
        let mut change: Vec<(AssetId, u64)> = Vec::new();

        for input in &tx.inputs {
            if let Input::Coin {
                utxo_id,
                amount,
                asset_id,
                ..
            } = input
            {
                let idx = state
                    .coins
                    .iter()
                    .position(|c| &c.utxo_id == utxo_id)
                    .ok_or_else(|| {
                        VaultError::ChainRejected(format!("input {} already spent", utxo_id))
                    })?;
                spent.push(idx);
                match change.iter_mut().find(|(a, _)| a == asset_id) {
                    Some((_, total)) => *total = total.saturating_add(*amount),
                    None => change.push((*asset_id, *amount)),
                }
            }
        }

        for output in &tx.outputs {
            if let Output::Coin {
                amount, asset_id, ..
            } = output
            {
                let entry = change
                    .iter_mut()
                    .find(|(a, _)| a == asset_id)
                    .ok_or_else(|| {
                        VaultError::ChainRejected(format!("no input funds asset {}", asset_id))
                    })?;
                entry.1 = entry.1.checked_sub(*amount).ok_or_else(|| {
                    VaultError::ChainRejected(format!("outputs exceed inputs for asset {}", asset_id))
                })?;
            }
        }

        spent.sort_unstable_by(|a, b| b.cmp(a));
        spent.dedup();
        for idx in spent {
            state.coins.remove(idx);
        }

        let mut w = Sha256Writer::new();
        w.write_bytes(signed.identity.as_bytes())
            .write_u64(state.next_nonce);
        state.next_nonce += 1;
        let tx_id = Bytes32::new(w.finish());

        for (index, output) in tx.outputs.iter().enumerate() {
            let utxo_id = UtxoId::new(tx_id, index as u16);
            match output {
                Output::Coin {
                    to,
                    amount,
                    asset_id,
                } => state.coins.push(Coin {
                    utxo_id,
                    owner: *to,
                    asset_id: *asset_id,
                    amount: *amount,
                }),
                Output::Change { to, asset_id } => {
                    let amount = change
                        .iter()
                        .find(|(a, _)| a == asset_id)
                        .map(|(_, v)| *v)
                        .unwrap_or(0);
                    if amount > 0 {
                        state.coins.push(Coin {
                            utxo_id,
                            owner: *to,
                            asset_id: *asset_id,
                            amount,
                        });
                    }
                }
                _ => {}
            }
        }

        let submitted = Submitted {
            pending_left: state.pending_rounds,
            outcome: state.outcome.clone(),
        };
        state.submitted.insert(tx_id, submitted);
        state.history.push(signed.clone());

        info!(tx_id = %tx_id, identity = %signed.identity, "transaction accepted");
        Ok(tx_id)
    }

    async fn get_finality_result(&self, tx_id: &TxId) -> Result<FinalityOutcome> {
        let mut state = self.state.lock();
        let entry = state
            .submitted
            .get_mut(tx_id)
            .ok_or_else(|| {
                VaultError::ChainRejected(format!("unknown transaction {}", tx_id))
            })?;

        if entry.pending_left > 0 {
            entry.pending_left -= 1;
            return Ok(FinalityOutcome::Pending);
        }
        Ok(entry.outcome.clone())
    }
}
