//! Core type definitions for vault transactions.
//!
//! These mirror the logical shape of a chain transaction request: typed
//! inputs and outputs, script bytes, fee policies and witness slots. Binary
//! encoding for submission is the chain provider's job; this crate only
//! guarantees the logical shape and the identity hash.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::primitives::{hex_bytes, Address, AssetId, Bytes32, ContractId, UtxoId};

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// Discriminant for the kind of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Runs a script (a plain transfer is a script transaction with an empty
    /// script).
    Script,
    /// Deploys a contract.
    Create,
}

impl TransactionType {
    /// Tag written into the identity encoding.
    pub fn tag(&self) -> u64 {
        match self {
            Self::Script => 0,
            Self::Create => 1,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "Script"),
            Self::Create => write!(f, "Create"),
        }
    }
}

// ---------------------------------------------------------------------------
// Coin
// ---------------------------------------------------------------------------

/// A spendable UTXO as returned by coin selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Output being spent.
    pub utxo_id: UtxoId,
    /// Current owner.
    pub owner: Address,
    /// Asset held.
    pub asset_id: AssetId,
    /// Amount held.
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Input {
    /// Spends a coin. Predicate-owned coins carry the predicate bytecode and
    /// its input data so they can be verified without key material.
    Coin {
        utxo_id: UtxoId,
        owner: Address,
        amount: u64,
        asset_id: AssetId,
        #[serde(with = "hex_bytes", default)]
        predicate: Vec<u8>,
        #[serde(with = "hex_bytes", default)]
        predicate_data: Vec<u8>,
    },
    /// Reads contract state.
    Contract { contract_id: ContractId },
    /// Spends a bridged message.
    Message {
        sender: Address,
        recipient: Address,
        amount: u64,
        nonce: Bytes32,
    },
}

impl Input {
    /// Tag written into the identity encoding.
    pub fn tag(&self) -> u64 {
        match self {
            Self::Coin { .. } => 0,
            Self::Contract { .. } => 1,
            Self::Message { .. } => 2,
        }
    }

    /// Builds an unpredicated coin input.
    pub fn coin(coin: &Coin) -> Self {
        Self::Coin {
            utxo_id: coin.utxo_id,
            owner: coin.owner,
            amount: coin.amount,
            asset_id: coin.asset_id,
            predicate: Vec::new(),
            predicate_data: Vec::new(),
        }
    }

    /// Owner for coin inputs, `None` otherwise.
    pub fn owner(&self) -> Option<&Address> {
        match self {
            Self::Coin { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Output {
    /// Pays `amount` of `asset_id` to `to`.
    Coin {
        to: Address,
        amount: u64,
        asset_id: AssetId,
    },
    /// Contract state output paired with a contract input.
    Contract { input_index: u16 },
    /// Returns whatever is left of `asset_id` to `to`.
    Change { to: Address, asset_id: AssetId },
    /// Amount set by the script at execution time.
    Variable {
        to: Address,
        amount: u64,
        asset_id: AssetId,
    },
    /// Contract created by a `Create` transaction.
    ContractCreated {
        contract_id: ContractId,
        state_root: Bytes32,
    },
}

impl Output {
    /// Kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Coin { .. } => "coin",
            Self::Contract { .. } => "contract",
            Self::Change { .. } => "change",
            Self::Variable { .. } => "variable",
            Self::ContractCreated { .. } => "contract_created",
        }
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Fee policy fields written into the transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policies {
    /// Ceiling on the fee the transaction may pay.
    pub max_fee: u64,
    /// Price per unit of gas.
    pub gas_price: u64,
    /// Script gas limit.
    pub gas_limit: u64,
}

// ---------------------------------------------------------------------------
// UnsignedTransaction
// ---------------------------------------------------------------------------

/// A transaction ready for signature collection.
///
/// Witness slots are placeholders until quorum is reached; they are not part
/// of the identity hash, so filling them never changes what signers signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Kind of transaction.
    pub tx_type: TransactionType,
    /// Ordered inputs.
    pub inputs: Vec<Input>,
    /// Ordered outputs.
    pub outputs: Vec<Output>,
    /// Script bytecode, empty for plain transfers.
    #[serde(with = "hex_bytes", default)]
    pub script: Vec<u8>,
    /// Script input data.
    #[serde(with = "hex_bytes", default)]
    pub script_data: Vec<u8>,
    /// Fee policies.
    pub policies: Policies,
    /// Witness slots.
    #[serde(default)]
    pub witnesses: Vec<String>,
}

impl UnsignedTransaction {
    /// Returns `true` if the transaction carries a non-empty script.
    pub fn has_script(&self) -> bool {
        !self.script.is_empty()
    }

    /// Coin outputs only.
    pub fn coin_outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs
            .iter()
            .filter(|o| matches!(o, Output::Coin { .. }))
    }
}

/// A transaction with its witnesses attached, ready for the chain provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The transaction, witness slots filled in.
    pub transaction: UnsignedTransaction,
    /// Identity hash the witnesses signed.
    pub identity: Bytes32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_tags() {
        assert_eq!(TransactionType::Script.tag(), 0);
        assert_eq!(TransactionType::Create.tag(), 1);
        assert_eq!(TransactionType::Create.to_string(), "Create");
    }

    #[test]
    fn input_tags() {
        let coin = Coin {
            utxo_id: UtxoId::new(Bytes32::ZERO, 0),
            owner: Address::new([1; 32]),
            asset_id: AssetId::ZERO,
            amount: 5,
        };
        assert_eq!(Input::coin(&coin).tag(), 0);
        assert_eq!(
            Input::Contract {
                contract_id: ContractId::ZERO
            }
            .tag(),
            1
        );
        assert_eq!(Input::coin(&coin).owner(), Some(&coin.owner));
    }

    #[test]
    fn input_json_is_tagged() {
        let input = Input::Contract {
            contract_id: ContractId::new([3; 32]),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["type"], "contract");
    }

    #[test]
    fn coin_outputs_filters_change() {
        let tx = UnsignedTransaction {
            tx_type: TransactionType::Script,
            inputs: vec![],
            outputs: vec![
                Output::Coin {
                    to: Address::new([1; 32]),
                    amount: 1,
                    asset_id: AssetId::ZERO,
                },
                Output::Change {
                    to: Address::new([2; 32]),
                    asset_id: AssetId::ZERO,
                },
            ],
            script: vec![],
            script_data: vec![],
            policies: Policies::default(),
            witnesses: vec![],
        };
        assert_eq!(tx.coin_outputs().count(), 1);
        assert!(!tx.has_script());
    }
}
