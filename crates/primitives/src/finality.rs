use serde::{Deserialize, Serialize};

/// The settlement status of an L2 transaction on L1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalityStatus {
    /// Settlement evidence is incomplete.
    #[default]
    Pending,
    /// The batch is posted on an optimistic rollup and its dispute window is still open.
    ChallengePeriod,
    /// The batch is considered irreversible.
    Finalized,
    /// The settlement of the batch is contested: the batch transaction reverted on L1.
    Disputed,
}

impl core::fmt::Display for FinalityStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::ChallengePeriod => write!(f, "challenge_period"),
            Self::Finalized => write!(f, "finalized"),
            Self::Disputed => write!(f, "disputed"),
        }
    }
}

/// The security level reached by a settlement, ordered from weakest to strongest.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Below the medium confirmation threshold.
    #[default]
    Low,
    /// At least the medium confirmation threshold.
    Medium,
    /// At least the high confirmation threshold.
    High,
    /// At least the maximum confirmation threshold.
    Maximum,
}

/// Finality estimate of a batch settlement.
///
/// Always derived fresh from the current L1 state, never patched incrementally.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalityMetrics {
    /// The settlement status.
    pub status: FinalityStatus,
    /// Estimated certainty that the settlement is irreversible, between 0 and 100.
    pub confidence: u8,
    /// The number of L1 blocks built on top of the batch block.
    pub l1_confirmations: u64,
    /// The remaining hours of the challenge period. Only set for optimistic rollups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_period_remaining_hours: Option<f64>,
    /// Whether a validity proof was verified on L1. Only set for zk rollups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_verified: Option<bool>,
    /// The security level of the settlement.
    pub security_level: SecurityLevel,
}

impl FinalityMetrics {
    /// Returns true if the settlement is final.
    pub const fn is_finalized(&self) -> bool {
        matches!(self.status, FinalityStatus::Finalized)
    }
}
