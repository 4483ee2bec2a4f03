//! Deterministic predicate address derivation.
//!
//! ```text
//! configurable = threshold:u64be || slot[0] || … || slot[9] || code_id
//! address      = SHA-256("FUEL" || configurable)
//! ```
//!
//! Sentinel slots are hashed too, so the layout stays fixed-width and a
//! vault with signers `[A, B]` differs from one with `[B, A]`. A missing
//! predicate code id is encoded as 32 zero bytes.

use crate::config::ADDRESS_SEED;
use crate::crypto::Sha256Writer;
use crate::error::Result;
use crate::predicate::config::VaultConfig;
use crate::primitives::{Address, Bytes32};

/// Canonical encoding of the predicate's configurable block.
///
/// This is appended to the predicate bytecode template, so the bytes the
/// chain executes and the bytes the address commits to are the same.
pub fn configurable_bytes(config: &VaultConfig) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 32 * config.slots().len() + 32);
    buf.extend_from_slice(&config.threshold().to_be_bytes());
    for slot in config.slots() {
        buf.extend_from_slice(slot.as_bytes());
    }
    buf.extend_from_slice(config.predicate_code().unwrap_or(&Bytes32::ZERO).as_bytes());
    buf
}

/// Derives the vault address from its configuration.
///
/// # Errors
/// `InvalidConfig` if the configuration violates its invariants.
pub fn derive_address(config: &VaultConfig) -> Result<Address> {
    config.validate()?;

    let mut writer = Sha256Writer::new();
    writer
        .write_bytes(&ADDRESS_SEED)
        .write_bytes(&configurable_bytes(config));
    Ok(Address::new(writer.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SIGNERS;
    use crate::error::VaultError;

    fn signers() -> Vec<Address> {
        vec![
            Address::new([1u8; 32]),
            Address::new([2u8; 32]),
            Address::new([3u8; 32]),
        ]
    }

    #[test]
    fn address_determinism() {
        let a = VaultConfig::new(signers(), 2).unwrap();
        let b = VaultConfig::new(signers(), 2).unwrap();
        assert_eq!(derive_address(&a).unwrap(), derive_address(&b).unwrap());
    }

    #[test]
    fn signer_order_changes_address() {
        let mut reversed = signers();
        reversed.reverse();
        let a = VaultConfig::new(signers(), 2).unwrap();
        let b = VaultConfig::new(reversed, 2).unwrap();
        assert_ne!(derive_address(&a).unwrap(), derive_address(&b).unwrap());
    }

    #[test]
    fn threshold_changes_address() {
        let a = VaultConfig::new(signers(), 1).unwrap();
        let b = VaultConfig::new(signers(), 2).unwrap();
        assert_ne!(derive_address(&a).unwrap(), derive_address(&b).unwrap());
    }

    #[test]
    fn predicate_code_changes_address() {
        let a = VaultConfig::new(signers(), 2).unwrap();
        let b = a.clone().with_predicate_code(Bytes32::new([9u8; 32]));
        assert_ne!(derive_address(&a).unwrap(), derive_address(&b).unwrap());
    }

    #[test]
    fn network_does_not_change_address() {
        let a = VaultConfig::new(signers(), 2).unwrap();
        let b = a.clone().with_network("http://testnet:4000/graphql", 9);
        assert_eq!(derive_address(&a).unwrap(), derive_address(&b).unwrap());
    }

    #[test]
    fn configurable_layout_is_fixed_width() {
        let one = VaultConfig::new(vec![Address::new([1u8; 32])], 1).unwrap();
        let three = VaultConfig::new(signers(), 2).unwrap();
        assert_eq!(configurable_bytes(&one).len(), 8 + 32 * MAX_SIGNERS + 32);
        assert_eq!(configurable_bytes(&one).len(), configurable_bytes(&three).len());
    }

    #[test]
    fn invalid_deserialized_config_fails_derivation() {
        let config = VaultConfig::new(signers(), 2).unwrap();
        let mut json = serde_json::to_value(&config).unwrap();
        json["threshold"] = serde_json::json!(0);
        let broken: VaultConfig = serde_json::from_value(json).unwrap();
        assert!(matches!(
            derive_address(&broken),
            Err(VaultError::InvalidConfig(_))
        ));
    }
}
