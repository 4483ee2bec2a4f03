//! # Protocol Configuration & Constants
//!
//! Every magic number the vault protocol depends on lives here, next to the
//! [`ClientConfig`] callers hand to [`crate::client::VaultClient`]. There is
//! no process-wide mutable configuration: two clients pointed at different
//! networks can live in the same process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::primitives::AssetId;

// ---------------------------------------------------------------------------
// Predicate Layout
// ---------------------------------------------------------------------------

/// Number of signer slots in the predicate's configurable block. Unused
/// slots are filled with the zero address so the layout is fixed-width.
pub const MAX_SIGNERS: usize = 10;

/// Seed prepended to the configurable block before hashing it into the
/// predicate address. `"FUEL"` in ASCII.
pub const ADDRESS_SEED: [u8; 4] = [0x46, 0x55, 0x45, 0x4C];

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Margin added on top of the chain's max-fee estimate before it is written
/// into the transaction policies. Estimates drift between build and submit.
pub const FEE_SAFETY_MARGIN_PERCENT: u64 = 20;

/// Protocol fee, in base-asset units, reserved for every transfer.
pub const DEFAULT_FEE: u64 = 1;

/// Gas limit used when no estimate has been obtained yet.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Delay between two polls of the backend record inside `wait`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Upper bound on a single `wait` call. A transfer that never finalizes
/// surfaces as [`crate::error::VaultError::WaitTimeout`].
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend record ids are UUIDs (36 chars); anything longer is a hash.
pub const SHORT_ID_MAX_LEN: usize = 36;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Default chain provider endpoint (a local node).
pub const DEFAULT_NETWORK_URL: &str = "http://localhost:4000/graphql";

/// Default backend API endpoint.
pub const DEFAULT_API_URL: &str = "http://localhost:3333";

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Settings for a [`crate::client::VaultClient`].
///
/// Durations are stored as milliseconds so the struct round-trips through
/// JSON without a custom format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chain provider endpoint.
    pub network_url: String,

    /// Backend transaction store endpoint.
    pub api_url: String,

    /// Protocol fee added to the base-asset requirement of every transfer.
    pub default_fee: u64,

    /// The chain's base asset, which pays fees.
    pub base_asset_id: AssetId,

    /// Delay between polls inside `wait`, in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound on a single `wait`, in milliseconds.
    pub poll_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network_url: DEFAULT_NETWORK_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            default_fee: DEFAULT_FEE,
            base_asset_id: AssetId::ZERO,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make `wait` spin or never poll.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(VaultError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.poll_timeout_ms < self.poll_interval_ms {
            return Err(VaultError::InvalidConfig(format!(
                "poll timeout {}ms is shorter than poll interval {}ms",
                self.poll_timeout_ms, self.poll_interval_ms
            )));
        }
        if self.network_url.is_empty() {
            return Err(VaultError::InvalidConfig(
                "network url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poll timeout as a [`Duration`].
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_seed_is_ascii() {
        assert_eq!(&ADDRESS_SEED, b"FUEL");
    }

    #[test]
    fn default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(config.poll_timeout(), DEFAULT_POLL_TIMEOUT);
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = ClientConfig::from_json(r#"{"default_fee": 5}"#).unwrap();
        assert_eq!(config.default_fee, 5);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.base_asset_id, AssetId::ZERO);
    }

    #[test]
    fn zero_interval_rejected() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn timeout_shorter_than_interval_rejected() {
        let err = ClientConfig::from_json(r#"{"poll_interval_ms": 500, "poll_timeout_ms": 100}"#)
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn timing_constants_sanity() {
        assert!(DEFAULT_POLL_INTERVAL < DEFAULT_POLL_TIMEOUT);
        assert!(FEE_SAFETY_MARGIN_PERCENT < 100);
        assert_eq!(SHORT_ID_MAX_LEN, 36);
    }
}
