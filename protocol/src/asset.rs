//! Asset aggregation for vault transfers.
//!
//! Callers describe a transfer as a flat list of [`TransferAsset`] entries
//! that may repeat recipients and assets. Before anything is built the list
//! is folded twice:
//!
//! - [`group_by_recipient`] merges it into the coin outputs, one per
//!   `(recipient, asset)` pair, in first-seen order. Output order feeds the
//!   identity hash, so the order is part of the contract.
//! - [`group_by_asset`] sums it per asset to size the coin-selection request,
//!   and [`apply_fee`] then reserves the protocol fee on the base asset.
//!
//! Everything here is pure. Overflow is an error, never a wrap.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::primitives::{Address, AssetId};
use crate::transaction::types::Output;

/// One requested movement of value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAsset {
    /// Asset to move.
    pub asset_id: AssetId,
    /// Recipient address.
    pub to: Address,
    /// Amount in the asset's smallest unit.
    pub amount: u64,
}

impl TransferAsset {
    /// Creates a new transfer entry.
    pub fn new(asset_id: AssetId, to: Address, amount: u64) -> Self {
        Self {
            asset_id,
            to,
            amount,
        }
    }
}

/// An amount of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    /// The asset.
    pub asset_id: AssetId,
    /// Amount in the asset's smallest unit.
    pub amount: u64,
}

/// All assets going to one recipient, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutputs {
    /// Recipient address.
    pub to: Address,
    /// Merged amounts per asset.
    pub assets: Vec<AssetAmount>,
}

/// Per-asset totals, in first-seen order.
///
/// A small ordered map. Transfers touch a handful of assets, so a linear
/// scan beats hashing and keeps iteration deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAmounts(Vec<AssetAmount>);

impl RequiredAmounts {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the entry for `asset_id`, appending it if absent.
    pub fn add(&mut self, asset_id: AssetId, amount: u64) -> Result<()> {
        match self.0.iter_mut().find(|a| a.asset_id == asset_id) {
            Some(entry) => {
                entry.amount = entry
                    .amount
                    .checked_add(amount)
                    .ok_or(VaultError::AmountOverflow(asset_id))?;
            }
            None => self.0.push(AssetAmount { asset_id, amount }),
        }
        Ok(())
    }

    /// Amount required for `asset_id`, zero if absent.
    pub fn get(&self, asset_id: &AssetId) -> u64 {
        self.0
            .iter()
            .find(|a| &a.asset_id == asset_id)
            .map(|a| a.amount)
            .unwrap_or(0)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetAmount> {
        self.0.iter()
    }

    /// Number of distinct assets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no asset is required.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for RequiredAmounts {
    type Item = AssetAmount;
    type IntoIter = std::vec::IntoIter<AssetAmount>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Merges entries sharing `(recipient, asset)` into one output each.
///
/// Recipients appear in the order they are first seen, and assets within a
/// recipient in the order they are first seen for that recipient.
pub fn group_by_recipient(assets: &[TransferAsset]) -> Result<Vec<RecipientOutputs>> {
    let mut grouped: Vec<RecipientOutputs> = Vec::new();

    for entry in assets {
        let idx = match grouped.iter().position(|r| r.to == entry.to) {
            Some(idx) => idx,
            None => {
                grouped.push(RecipientOutputs {
                    to: entry.to,
                    assets: Vec::new(),
                });
                grouped.len() - 1
            }
        };
        let recipient = &mut grouped[idx];

        match recipient
            .assets
            .iter_mut()
            .find(|a| a.asset_id == entry.asset_id)
        {
            Some(existing) => {
                existing.amount = existing
                    .amount
                    .checked_add(entry.amount)
                    .ok_or(VaultError::AmountOverflow(entry.asset_id))?;
            }
            None => recipient.assets.push(AssetAmount {
                asset_id: entry.asset_id,
                amount: entry.amount,
            }),
        }
    }

    Ok(grouped)
}

/// Sums the requested amount per asset.
pub fn group_by_asset(assets: &[TransferAsset]) -> Result<RequiredAmounts> {
    let mut required = RequiredAmounts::new();
    for entry in assets {
        required.add(entry.asset_id, entry.amount)?;
    }
    Ok(required)
}

/// Reserves `fee` on the base asset, exactly once.
///
/// The fee is signed so that a misconfigured negative value is reported
/// instead of silently reducing the requirement.
pub fn apply_fee(required: RequiredAmounts, fee: i64, base_asset: AssetId) -> Result<RequiredAmounts> {
    if fee < 0 {
        return Err(VaultError::InvalidFeeAsset(fee));
    }
    let mut with_fee = required;
    with_fee.add(base_asset, fee as u64)?;
    Ok(with_fee)
}

/// Flattens grouped outputs back into transfer entries.
pub fn flatten(grouped: &[RecipientOutputs]) -> Vec<TransferAsset> {
    grouped
        .iter()
        .flat_map(|r| {
            r.assets
                .iter()
                .map(move |a| TransferAsset::new(a.asset_id, r.to, a.amount))
        })
        .collect()
}

/// Recovers the transfer entries described by a transaction's coin outputs.
///
/// Change, contract and variable outputs carry no requested transfer and
/// are skipped.
pub fn outputs_to_assets(outputs: &[Output]) -> Vec<TransferAsset> {
    outputs
        .iter()
        .filter_map(|o| match o {
            Output::Coin {
                to,
                amount,
                asset_id,
            } => Some(TransferAsset::new(*asset_id, *to, *amount)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 32])
    }

    fn asset(b: u8) -> AssetId {
        AssetId::new([b; 32])
    }

    #[test]
    fn merges_same_recipient_and_asset() {
        let list = vec![
            TransferAsset::new(asset(1), addr(0xA), 10),
            TransferAsset::new(asset(1), addr(0xA), 15),
        ];
        let grouped = group_by_recipient(&list).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].assets, vec![AssetAmount { asset_id: asset(1), amount: 25 }]);
    }

    #[test]
    fn preserves_first_seen_order() {
        let list = vec![
            TransferAsset::new(asset(2), addr(0xB), 1),
            TransferAsset::new(asset(1), addr(0xA), 2),
            TransferAsset::new(asset(1), addr(0xB), 3),
            TransferAsset::new(asset(2), addr(0xB), 4),
        ];
        let grouped = group_by_recipient(&list).unwrap();
        assert_eq!(grouped[0].to, addr(0xB));
        assert_eq!(grouped[1].to, addr(0xA));
        let b_assets: Vec<_> = grouped[0].assets.iter().map(|a| (a.asset_id, a.amount)).collect();
        assert_eq!(b_assets, vec![(asset(2), 5), (asset(1), 3)]);
    }

    #[test]
    fn group_by_asset_sums_across_recipients() {
        let list = vec![
            TransferAsset::new(asset(1), addr(0xA), 10),
            TransferAsset::new(asset(2), addr(0xA), 7),
            TransferAsset::new(asset(1), addr(0xB), 5),
        ];
        let required = group_by_asset(&list).unwrap();
        assert_eq!(required.len(), 2);
        assert_eq!(required.get(&asset(1)), 15);
        assert_eq!(required.get(&asset(2)), 7);
        assert_eq!(required.get(&asset(9)), 0);
    }

    #[test]
    fn fee_added_once_to_existing_base_entry() {
        let base = AssetId::ZERO;
        let list = vec![
            TransferAsset::new(base, addr(0xA), 100),
            TransferAsset::new(base, addr(0xB), 50),
            TransferAsset::new(asset(3), addr(0xA), 9),
        ];
        let before = group_by_asset(&list).unwrap();
        let total_before: u64 = before.iter().map(|a| a.amount).sum();
        let after = apply_fee(before, 7, base).unwrap();
        let total_after: u64 = after.iter().map(|a| a.amount).sum();

        assert_eq!(total_after - total_before, 7);
        assert_eq!(after.get(&base), 157);
        assert_eq!(after.get(&asset(3)), 9);
    }

    #[test]
    fn fee_creates_base_entry_when_absent() {
        let list = vec![TransferAsset::new(asset(3), addr(0xA), 9)];
        let after = apply_fee(group_by_asset(&list).unwrap(), 2, AssetId::ZERO).unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after.get(&AssetId::ZERO), 2);
    }

    #[test]
    fn negative_fee_rejected() {
        let err = apply_fee(RequiredAmounts::new(), -1, AssetId::ZERO).unwrap_err();
        assert!(matches!(err, VaultError::InvalidFeeAsset(-1)));
    }

    #[test]
    fn overflow_is_reported() {
        let list = vec![
            TransferAsset::new(asset(1), addr(0xA), u64::MAX),
            TransferAsset::new(asset(1), addr(0xA), 1),
        ];
        assert!(matches!(
            group_by_recipient(&list),
            Err(VaultError::AmountOverflow(_))
        ));
        assert!(matches!(group_by_asset(&list), Err(VaultError::AmountOverflow(_))));
    }

    #[test]
    fn flatten_inverts_grouping_for_merged_lists() {
        let list = vec![
            TransferAsset::new(asset(1), addr(0xA), 10),
            TransferAsset::new(asset(2), addr(0xB), 20),
        ];
        let grouped = group_by_recipient(&list).unwrap();
        assert_eq!(flatten(&grouped), list);
    }

    #[test]
    fn outputs_to_assets_skips_change() {
        let outputs = vec![
            Output::Coin {
                to: addr(0xA),
                amount: 5,
                asset_id: asset(1),
            },
            Output::Change {
                to: addr(0xF),
                asset_id: asset(1),
            },
        ];
        let assets = outputs_to_assets(&outputs);
        assert_eq!(assets, vec![TransferAsset::new(asset(1), addr(0xA), 5)]);
    }
}
