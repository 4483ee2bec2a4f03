//! Witnesses: one signer's answer to a transfer.

use serde::{Deserialize, Serialize};

use crate::primitives::Address;

/// A signer's response. A confirmed witness carries the signature over the
/// transaction identity; a declined one carries none and never counts
/// towards quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// The signer.
    pub account: Address,
    /// Hex signature over the identity hash.
    #[serde(default)]
    pub signature: Option<String>,
    /// Whether the signer approved.
    pub confirmed: bool,
}

impl Witness {
    /// An approving witness.
    pub fn confirmed(account: Address, signature: impl Into<String>) -> Self {
        Self {
            account,
            signature: Some(signature.into()),
            confirmed: true,
        }
    }

    /// A declining witness.
    pub fn declined(account: Address) -> Self {
        Self {
            account,
            signature: None,
            confirmed: false,
        }
    }
}

/// Witnesses keyed by account, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WitnessSet(Vec<Witness>);

impl WitnessSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `witness`. Returns `false` when nothing changed.
    ///
    /// A confirmed witness is final: later answers from the same account,
    /// confirming or declining, are ignored.
    pub fn record(&mut self, witness: Witness) -> bool {
        match self.0.iter_mut().find(|w| w.account == witness.account) {
            Some(existing) if existing.confirmed => false,
            Some(existing) => {
                if !witness.confirmed {
                    return false;
                }
                *existing = witness;
                true
            }
            None => {
                self.0.push(witness);
                true
            }
        }
    }

    /// Merges every witness of `other` into this set.
    pub fn merge(&mut self, other: &WitnessSet) {
        self.merge_where(other, |_| true);
    }

    /// Merges the witnesses of `other` accepted by `keep` and returns the
    /// accounts of the ones it refused.
    pub fn merge_where<F>(&mut self, other: &WitnessSet, mut keep: F) -> Vec<Address>
    where
        F: FnMut(&Witness) -> bool,
    {
        let mut refused = Vec::new();
        for w in other.iter() {
            if keep(w) {
                self.record(w.clone());
            } else {
                refused.push(w.account);
            }
        }
        refused
    }

    /// The witness of `account`, if any.
    pub fn get(&self, account: &Address) -> Option<&Witness> {
        self.0.iter().find(|w| &w.account == account)
    }

    /// Number of confirmed witnesses.
    pub fn confirmed_count(&self) -> usize {
        self.0.iter().filter(|w| w.confirmed).count()
    }

    /// Signatures of confirmed witnesses, in arrival order.
    pub fn signatures(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|w| w.confirmed)
            .filter_map(|w| w.signature.clone())
            .collect()
    }

    /// Iterates witnesses in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Witness> {
        self.0.iter()
    }

    /// Number of witnesses, declined included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no signer has answered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Witness> for WitnessSet {
    fn from_iter<I: IntoIterator<Item = Witness>>(iter: I) -> Self {
        let mut set = WitnessSet::new();
        for w in iter {
            set.record(w);
        }
        set
    }
}
