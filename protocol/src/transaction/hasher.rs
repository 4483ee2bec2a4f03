//! Canonical transaction identity.
//!
//! The identity is the digest every signer signs and the key under which
//! the backend tracks a transaction across retries. It commits only to the
//! fields the predicate can observe on-chain, in this order (every integer
//! is a big-endian `u64`):
//!
//! ```text
//! type || input_count || output_count || inputs… || outputs…
//!
//! coin input       0 || amount || asset_id || owner
//! contract input   1
//! message input    2 || sender || recipient || amount
//! coin output      0 || amount || asset_id || to
//! contract output  1
//! change output    2
//! ```
//!
//! Contract and change entries contribute their tag only: the predicate
//! cannot read their other fields. Any other kind is rejected rather than
//! skipped, because a skipped field would let the submitted transaction
//! differ from what signers approved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Input, Output, UnsignedTransaction};
use crate::crypto::Sha256Writer;
use crate::error::{Result, VaultError};
use crate::primitives::{Bytes32, ParseBytesError};

/// The 32-byte identity hash of a transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionIdentity(Bytes32);

impl TransactionIdentity {
    /// Wraps a digest.
    pub fn new(digest: Bytes32) -> Self {
        Self(digest)
    }

    /// The digest as bytes.
    pub fn as_bytes32(&self) -> &Bytes32 {
        &self.0
    }

    /// Hex without `0x`. This exact string is the message signers sign and
    /// the hash stored by the backend.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Display for TransactionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransactionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionIdentity({})", self.to_hex())
    }
}

impl FromStr for TransactionIdentity {
    type Err = ParseBytesError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Computes the identity hash of `tx`.
///
/// # Errors
/// `UnsupportedFieldKind` for variable or contract-created outputs.
pub fn hash_transaction(tx: &UnsignedTransaction) -> Result<TransactionIdentity> {
    let mut w = Sha256Writer::new();
    w.write_u64(tx.tx_type.tag())
        .write_u64(tx.inputs.len() as u64)
        .write_u64(tx.outputs.len() as u64);

    for input in &tx.inputs {
        encode_input(&mut w, input);
    }
    for output in &tx.outputs {
        encode_output(&mut w, output)?;
    }

    let encoded_len = w.len();
    let identity = TransactionIdentity(Bytes32::new(w.finish()));
    debug!(
        identity = %identity,
        inputs = tx.inputs.len(),
        outputs = tx.outputs.len(),
        encoded_len,
        "transaction identity computed"
    );
    Ok(identity)
}

fn encode_input(w: &mut Sha256Writer, input: &Input) {
    w.write_u64(input.tag());
    match input {
        Input::Coin {
            owner,
            amount,
            asset_id,
            ..
        } => {
            w.write_u64(*amount)
                .write_bytes(asset_id.as_bytes())
                .write_bytes(owner.as_bytes());
        }
        Input::Contract { .. } => {}
        Input::Message {
            sender,
            recipient,
            amount,
            ..
        } => {
            w.write_bytes(sender.as_bytes())
                .write_bytes(recipient.as_bytes())
                .write_u64(*amount);
        }
    }
}

fn encode_output(w: &mut Sha256Writer, output: &Output) -> Result<()> {
    match output {
        Output::Coin {
            to,
            amount,
            asset_id,
        } => {
            w.write_u64(0)
                .write_u64(*amount)
                .write_bytes(asset_id.as_bytes())
                .write_bytes(to.as_bytes());
        }
        Output::Contract { .. } => {
            w.write_u64(1);
        }
        Output::Change { .. } => {
            w.write_u64(2);
        }
        other => {
            return Err(VaultError::UnsupportedFieldKind(format!(
                "{} output",
                other.kind()
            )))
        }
    }
    Ok(())
}
