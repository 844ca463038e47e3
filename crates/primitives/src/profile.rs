use crate::{NetworkId, SecurityLevel, SECONDS_PER_HOUR};

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The security model of a rollup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityModel {
    /// Batches are assumed valid unless disputed within a challenge period.
    Optimistic,
    /// Batches are settled by a validity proof verified on L1.
    Zk,
}

impl core::fmt::Display for SecurityModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Optimistic => write!(f, "optimistic"),
            Self::Zk => write!(f, "zk"),
        }
    }
}

/// The rollup family, grouping networks which share a batch format and posting cadence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupFamily {
    /// Arbitrum Nitro chains.
    Arbitrum,
    /// OP-stack chains (Optimism, Base, ...).
    OpStack,
    /// zkSync Era chains.
    ZkSync,
    /// Polygon zkEVM chains.
    PolygonZkEvm,
    /// Scroll chains.
    Scroll,
    /// Linea chains.
    Linea,
}

impl RollupFamily {
    /// Returns the security model shared by the family.
    pub const fn security_model(&self) -> SecurityModel {
        match self {
            Self::Arbitrum | Self::OpStack => SecurityModel::Optimistic,
            Self::ZkSync | Self::PolygonZkEvm | Self::Scroll | Self::Linea => SecurityModel::Zk,
        }
    }

    /// Returns the typical number of L2 blocks covered by a single batch.
    pub const fn typical_batch_blocks(&self) -> u64 {
        match self {
            Self::Arbitrum => 100,
            Self::OpStack => 50,
            Self::ZkSync | Self::PolygonZkEvm | Self::Scroll | Self::Linea => 200,
        }
    }

    /// Returns the estimated number of L2 transactions sharing a batch.
    ///
    /// This is a rough constant standing in for a real batch transaction count query, costs
    /// amortized with it are estimates.
    pub const fn estimated_batch_size(&self) -> u64 {
        match self {
            Self::Arbitrum => 500,
            Self::OpStack => 300,
            Self::ZkSync => 1_500,
            Self::PolygonZkEvm | Self::Scroll | Self::Linea => 1_000,
        }
    }
}

impl core::fmt::Display for RollupFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Arbitrum => write!(f, "arbitrum"),
            Self::OpStack => write!(f, "op-stack"),
            Self::ZkSync => write!(f, "zksync"),
            Self::PolygonZkEvm => write!(f, "polygon-zkevm"),
            Self::Scroll => write!(f, "scroll"),
            Self::Linea => write!(f, "linea"),
        }
    }
}

/// L1 confirmation counts at which a settlement reaches each [`SecurityLevel`].
///
/// The defaults approximate one confirmation, about a minute, about two and a half minutes and
/// about seven minutes of 12 second L1 blocks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationThresholds {
    /// The low threshold.
    pub low: u64,
    /// The medium threshold.
    pub medium: u64,
    /// The high threshold.
    pub high: u64,
    /// The maximum threshold.
    pub maximum: u64,
}

impl Default for ConfirmationThresholds {
    fn default() -> Self {
        Self { low: 1, medium: 6, high: 12, maximum: 32 }
    }
}

impl ConfirmationThresholds {
    /// Returns the confirmation tier reached by the provided number of confirmations.
    pub const fn tier(&self, confirmations: u64) -> SecurityLevel {
        if confirmations >= self.maximum {
            SecurityLevel::Maximum
        } else if confirmations >= self.high {
            SecurityLevel::High
        } else if confirmations >= self.medium {
            SecurityLevel::Medium
        } else {
            SecurityLevel::Low
        }
    }
}

/// Static configuration of a rollup network. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupProfile {
    /// The L2 network.
    pub network_id: NetworkId,
    /// The L1 network the rollup settles to.
    pub l1_network_id: NetworkId,
    /// The rollup family.
    pub family: RollupFamily,
    /// The security model.
    pub security_model: SecurityModel,
    /// The L1 addresses submitting batches for the rollup.
    pub batch_poster_addresses: HashSet<Address>,
    /// The duration of the challenge period in hours. Zero for zk rollups.
    pub challenge_period_hours: u64,
    /// The confirmation thresholds.
    pub confirmation_thresholds: ConfirmationThresholds,
    /// Event signatures proving a validity proof was verified on L1.
    pub proof_verification_topics: Vec<B256>,
    /// Event signatures proving a batch was committed and awaits its proof.
    pub proof_submission_topics: Vec<B256>,
    /// The symbol of the token gas is paid in on L1.
    pub native_token_symbol: String,
}

impl RollupProfile {
    /// Returns true if the address posts batches for the rollup.
    pub fn is_batch_poster(&self, address: &Address) -> bool {
        self.batch_poster_addresses.contains(address)
    }

    /// Returns a copy of the profile with the batch posters replaced.
    pub fn with_batch_posters(&self, posters: impl IntoIterator<Item = Address>) -> Self {
        Self { batch_poster_addresses: posters.into_iter().collect(), ..self.clone() }
    }

    /// Returns the duration of the challenge period in seconds.
    pub const fn challenge_period_secs(&self) -> u64 {
        self.challenge_period_hours * SECONDS_PER_HOUR
    }

    /// Returns true if the rollup uses the optimistic security model.
    pub const fn is_optimistic(&self) -> bool {
        matches!(self.security_model, SecurityModel::Optimistic)
    }
}
