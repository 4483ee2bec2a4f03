//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] turns grouped outputs and a set of spendable
//! coins into an [`UnsignedTransaction`] shaped for predicate execution:
//!
//! - inputs are sorted by `(asset_id, utxo_id)`, so the same coin set always
//!   yields the same input order (and therefore the same identity hash),
//!   whatever order the chain returned the coins in;
//! - every input owned by the vault carries the predicate bytecode;
//! - coin outputs follow the grouped order, then exactly one change output
//!   per distinct spent asset returns the remainder to the vault;
//! - policies come from a caller-supplied [`FeeEstimate`] plus
//!   [`FEE_SAFETY_MARGIN_PERCENT`]. The builder never estimates.
//!
//! The builder does not hash and does not sign. See [`super::hasher`].

use tracing::debug;

use super::types::{Coin, Input, Output, Policies, TransactionType, UnsignedTransaction};
use crate::asset::{apply_fee, AssetAmount, RecipientOutputs, RequiredAmounts};
use crate::chain::FeeEstimate;
use crate::config::{DEFAULT_GAS_LIMIT, FEE_SAFETY_MARGIN_PERCENT};
use crate::error::{Result, VaultError};
use crate::predicate::Vault;
use crate::primitives::{Address, AssetId};

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for vault transactions.
///
/// ```rust,no_run
/// use quorum_vault::transaction::TransactionBuilder;
/// # use quorum_vault::primitives::{Address, AssetId};
/// # fn demo(vault: Address, outputs: Vec<quorum_vault::asset::RecipientOutputs>,
/// #         coins: Vec<quorum_vault::transaction::Coin>) -> quorum_vault::Result<()> {
/// let tx = TransactionBuilder::new(vault, AssetId::ZERO)
///     .predicate(vec![0x01, 0x02], vec![])
///     .outputs(outputs)
///     .coins(coins)
///     .fee(1)
///     .witness_slots(2)
///     .build()?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    owner: Address,
    base_asset: AssetId,
    predicate: Vec<u8>,
    predicate_data: Vec<u8>,
    outputs: Vec<RecipientOutputs>,
    coins: Vec<Coin>,
    witness_slots: usize,
    script: Vec<u8>,
    script_data: Vec<u8>,
    fee: i64,
    estimate: Option<FeeEstimate>,
}

impl TransactionBuilder {
    /// Creates a builder spending coins owned by `owner`, paying fees in
    /// `base_asset`.
    pub fn new(owner: Address, base_asset: AssetId) -> Self {
        Self {
            owner,
            base_asset,
            predicate: Vec::new(),
            predicate_data: Vec::new(),
            outputs: Vec::new(),
            coins: Vec::new(),
            witness_slots: 0,
            script: Vec::new(),
            script_data: Vec::new(),
            fee: 0,
            estimate: None,
        }
    }

    /// Creates a builder for `vault`, with its predicate bytecode attached
    /// to every vault-owned input.
    pub fn for_vault(vault: &Vault, base_asset: AssetId) -> Self {
        Self::new(*vault.address(), base_asset)
            .predicate(vault.predicate_bytecode(), vault.predicate_data())
    }

    /// Sets the predicate bytecode and input data for owned inputs.
    pub fn predicate(mut self, bytecode: Vec<u8>, data: Vec<u8>) -> Self {
        self.predicate = bytecode;
        self.predicate_data = data;
        self
    }

    /// Sets the grouped coin outputs.
    pub fn outputs(mut self, outputs: Vec<RecipientOutputs>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Sets the spendable coins.
    pub fn coins(mut self, coins: Vec<Coin>) -> Self {
        self.coins = coins;
        self
    }

    /// Number of witness placeholders to reserve.
    pub fn witness_slots(mut self, n: usize) -> Self {
        self.witness_slots = n;
        self
    }

    /// Attaches a script. A non-empty script makes this a script transaction
    /// that does more than move coins.
    pub fn script(mut self, script: Vec<u8>, script_data: Vec<u8>) -> Self {
        self.script = script;
        self.script_data = script_data;
        self
    }

    /// Protocol fee reserved on the base asset.
    pub fn fee(mut self, fee: i64) -> Self {
        self.fee = fee;
        self
    }

    /// Fee estimate obtained from the chain provider.
    pub fn estimate(mut self, estimate: FeeEstimate) -> Self {
        self.estimate = Some(estimate);
        self
    }

    /// Amounts the selected coins must cover: outputs plus fee.
    pub fn required_amounts(&self) -> Result<RequiredAmounts> {
        let mut required = RequiredAmounts::new();
        for recipient in &self.outputs {
            for AssetAmount { asset_id, amount } in &recipient.assets {
                required.add(*asset_id, *amount)?;
            }
        }
        apply_fee(required, self.fee, self.base_asset)
    }

    /// Consumes the builder and produces an unsigned transaction.
    ///
    /// # Errors
    /// `InsufficientFunds` naming the first asset the coins do not cover,
    /// `InvalidFeeAsset` for a negative fee.
    pub fn build(self) -> Result<UnsignedTransaction> {
        let required = self.required_amounts()?;

        let mut coins = self.coins;
        coins.sort_by(|a, b| {
            a.asset_id
                .cmp(&b.asset_id)
                .then_with(|| a.utxo_id.cmp(&b.utxo_id))
        });
        coins.dedup_by(|a, b| a.utxo_id == b.utxo_id);

        for need in required.iter() {
            let available = coins
                .iter()
                .filter(|c| c.asset_id == need.asset_id)
                .try_fold(0u64, |acc, c| acc.checked_add(c.amount))
                .ok_or(VaultError::AmountOverflow(need.asset_id))?;
            if available < need.amount {
                return Err(VaultError::InsufficientFunds {
                    asset_id: need.asset_id,
                    required: need.amount,
                    available,
                });
            }
        }

        let inputs: Vec<Input> = coins
            .iter()
            .map(|coin| {
                let mut input = Input::coin(coin);
                if coin.owner == self.owner {
                    if let Input::Coin {
                        predicate,
                        predicate_data,
                        ..
                    } = &mut input
                    {
                        *predicate = self.predicate.clone();
                        *predicate_data = self.predicate_data.clone();
                    }
                }
                input
            })
            .collect();

        let mut outputs: Vec<Output> = self
            .outputs
            .iter()
            .flat_map(|r| {
                r.assets.iter().map(move |a| Output::Coin {
                    to: r.to,
                    amount: a.amount,
                    asset_id: a.asset_id,
                })
            })
            .collect();

        let mut spent_assets: Vec<AssetId> = Vec::new();
        for coin in &coins {
            if !spent_assets.contains(&coin.asset_id) {
                spent_assets.push(coin.asset_id);
            }
        }
        for asset_id in &spent_assets {
            outputs.push(Output::Change {
                to: self.owner,
                asset_id: *asset_id,
            });
        }

        let policies = match self.estimate {
            Some(estimate) => estimate.to_policies(FEE_SAFETY_MARGIN_PERCENT),
            None => Policies {
                max_fee: self.fee.max(0) as u64,
                gas_price: 1,
                gas_limit: DEFAULT_GAS_LIMIT,
            },
        };

        debug!(
            inputs = inputs.len(),
            outputs = outputs.len(),
            change_outputs = spent_assets.len(),
            max_fee = policies.max_fee,
            "vault transaction built"
        );

        Ok(UnsignedTransaction {
            tx_type: TransactionType::Script,
            inputs,
            outputs,
            script: self.script,
            script_data: self.script_data,
            policies,
            witnesses: vec![String::new(); self.witness_slots],
        })
    }
}

/// Attaches predicate bytecode and data to every coin input of `tx` owned
/// by `owner`. Returns the number of inputs touched.
///
/// Used when adopting a transaction built elsewhere into the quorum flow.
pub fn attach_predicate(
    tx: &mut UnsignedTransaction,
    owner: &Address,
    bytecode: &[u8],
    data: &[u8],
) -> usize {
    let mut touched = 0;
    for input in &mut tx.inputs {
        if let Input::Coin {
            owner: input_owner,
            predicate,
            predicate_data,
            ..
        } = input
        {
            if input_owner == owner {
                *predicate = bytecode.to_vec();
                *predicate_data = data.to_vec();
                touched += 1;
            }
        }
    }
    touched
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{group_by_recipient, TransferAsset};
    use crate::primitives::{Bytes32, UtxoId};
    use crate::transaction::hasher::hash_transaction;

    const VAULT: Address = Address::new([0xAA; 32]);
    const OTHER_ASSET: AssetId = AssetId::new([0x0C; 32]);

    fn coin(tx: u8, asset_id: AssetId, amount: u64) -> Coin {
        Coin {
            utxo_id: UtxoId::new(Bytes32::new([tx; 32]), 0),
            owner: VAULT,
            asset_id,
            amount,
        }
    }

    fn outputs(amount: u64) -> Vec<RecipientOutputs> {
        group_by_recipient(&[TransferAsset::new(
            AssetId::ZERO,
            Address::new([0xBB; 32]),
            amount,
        )])
        .unwrap()
    }

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(VAULT, AssetId::ZERO).predicate(vec![0xDE, 0xAD], vec![0x01])
    }

    #[test]
    fn builds_predicate_inputs_and_change() {
        let tx = builder()
            .outputs(outputs(100))
            .coins(vec![coin(1, AssetId::ZERO, 60), coin(2, AssetId::ZERO, 60)])
            .fee(1)
            .witness_slots(3)
            .build()
            .unwrap();

        assert_eq!(tx.tx_type, TransactionType::Script);
        assert_eq!(tx.inputs.len(), 2);
        assert!(tx.inputs.iter().all(|i| matches!(
            i,
            Input::Coin { predicate, .. } if predicate == &vec![0xDE, 0xAD]
        )));
        assert_eq!(tx.outputs.len(), 2);
        assert!(matches!(tx.outputs[1], Output::Change { to, .. } if to == VAULT));
        assert_eq!(tx.witnesses.len(), 3);
    }

    #[test]
    fn one_change_output_per_spent_asset() {
        let tx = builder()
            .outputs(outputs(10))
            .coins(vec![
                coin(1, AssetId::ZERO, 60),
                coin(2, OTHER_ASSET, 5),
                coin(3, AssetId::ZERO, 60),
            ])
            .build()
            .unwrap();

        let changes: Vec<_> = tx
            .outputs
            .iter()
            .filter(|o| matches!(o, Output::Change { .. }))
            .collect();
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn input_order_is_independent_of_coin_order() {
        let coins = vec![
            coin(3, AssetId::ZERO, 60),
            coin(1, OTHER_ASSET, 5),
            coin(2, AssetId::ZERO, 60),
        ];
        let mut reversed = coins.clone();
        reversed.reverse();

        let a = builder().outputs(outputs(100)).coins(coins).build().unwrap();
        let b = builder().outputs(outputs(100)).coins(reversed).build().unwrap();
        assert_eq!(a.inputs, b.inputs);
        assert_eq!(hash_transaction(&a).unwrap(), hash_transaction(&b).unwrap());
    }

    #[test]
    fn insufficient_funds_names_asset() {
        let err = builder()
            .outputs(outputs(100))
            .coins(vec![coin(1, AssetId::ZERO, 100)])
            .fee(1)
            .build()
            .unwrap_err();

        match err {
            VaultError::InsufficientFunds {
                asset_id,
                required,
                available,
            } => {
                assert_eq!(asset_id, AssetId::ZERO);
                assert_eq!(required, 101);
                assert_eq!(available, 100);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_inputs_get_no_predicate() {
        let mut foreign = coin(9, AssetId::ZERO, 500);
        foreign.owner = Address::new([0x11; 32]);
        let tx = builder().outputs(outputs(1)).coins(vec![foreign]).build().unwrap();
        assert!(matches!(
            &tx.inputs[0],
            Input::Coin { predicate, .. } if predicate.is_empty()
        ));
    }

    #[test]
    fn estimate_sets_policies_with_margin() {
        let tx = builder()
            .outputs(outputs(1))
            .coins(vec![coin(1, AssetId::ZERO, 10)])
            .estimate(FeeEstimate {
                max_fee: 100,
                gas_price: 2,
                gas_limit: 50_000,
            })
            .build()
            .unwrap();
        assert_eq!(tx.policies.max_fee, 120);
        assert_eq!(tx.policies.gas_price, 2);
        assert_eq!(tx.policies.gas_limit, 50_000);
    }

    #[test]
    fn script_is_carried() {
        let tx = builder()
            .outputs(outputs(1))
            .coins(vec![coin(1, AssetId::ZERO, 10)])
            .script(vec![0x90, 0x00], vec![0x01])
            .build()
            .unwrap();
        assert!(tx.has_script());
        assert_eq!(tx.script_data, vec![0x01]);
    }

    #[test]
    fn duplicate_coins_are_spent_once() {
        let c = coin(1, AssetId::ZERO, 10);
        let tx = builder()
            .outputs(outputs(1))
            .coins(vec![c.clone(), c])
            .build()
            .unwrap();
        assert_eq!(tx.inputs.len(), 1);
    }

    #[test]
    fn attach_predicate_only_touches_owner_inputs() {
        let mut foreign = coin(9, AssetId::ZERO, 500);
        foreign.owner = Address::new([0x11; 32]);
        let mut tx = TransactionBuilder::new(VAULT, AssetId::ZERO)
            .outputs(outputs(1))
            .coins(vec![coin(1, AssetId::ZERO, 10), foreign])
            .build()
            .unwrap();

        let touched = attach_predicate(&mut tx, &VAULT, &[7, 7], &[]);
        assert_eq!(touched, 1);
    }
}
