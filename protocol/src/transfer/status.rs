//! Transfer status and its wire names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a transfer is in its lifecycle.
///
/// ```text
/// AwaitingRequirements ──quorum──▶ PendingSender ──submit──▶ ProcessingOnChain
///                                                             │
///                                               ┌─────────────┴─────────────┐
///                                               ▼                           ▼
///                                            Success                      Failed
/// ```
///
/// Terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Fewer confirmed witnesses than the threshold.
    #[serde(rename = "AWAIT_REQUIREMENTS")]
    AwaitingRequirements,
    /// Quorum reached, not yet submitted.
    #[serde(rename = "PENDING_SENDER")]
    PendingSender,
    /// Submitted, finality unknown.
    #[serde(rename = "PROCESS_ON_CHAIN")]
    ProcessingOnChain,
    /// Executed successfully on-chain.
    #[serde(rename = "SUCCESS")]
    Success,
    /// Reverted, dropped or declined.
    #[serde(rename = "FAILED")]
    Failed,
}

impl TransferStatus {
    /// Returns `true` for `Success` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Returns `true` once the transaction has been handed to the chain.
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::ProcessingOnChain | Self::Success | Self::Failed)
    }

    /// Position along the lifecycle. Status only ever moves to a higher rank.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::AwaitingRequirements => 0,
            Self::PendingSender => 1,
            Self::ProcessingOnChain => 2,
            Self::Success | Self::Failed => 3,
        }
    }

    /// Wire name used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingRequirements => "AWAIT_REQUIREMENTS",
            Self::PendingSender => "PENDING_SENDER",
            Self::ProcessingOnChain => "PROCESS_ON_CHAIN",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
