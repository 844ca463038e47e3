use crate::{AmortizedCost, FinalityMetrics, L2BlockRange, SessionId};

use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};

/// The identifier of a pending record.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "record-{}", self.0)
    }
}

/// Metadata of the L2 block confirming a tracked transaction.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2BlockMeta {
    /// The L2 block number.
    pub block_number: u64,
    /// Unix timestamp at which the transaction was confirmed on L2, in seconds.
    pub confirmation_time: u64,
}

/// The L1 settlement a pending record was attributed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1SettlementInfo {
    /// The hash of the L1 batch transaction.
    pub l1_tx_hash: TxHash,
    /// The L1 block of the batch transaction.
    pub l1_block_number: u64,
    /// The timestamp of the L1 block, in seconds.
    pub l1_timestamp: u64,
    /// Time between the L2 confirmation and the L1 settlement, in milliseconds.
    pub settlement_time_ms: u64,
    /// The estimated L2 block range of the batch.
    pub l2_block_range: L2BlockRange,
    /// The estimated number of L2 transactions sharing the batch.
    pub estimated_batch_size: u64,
    /// The amortized settlement cost.
    pub cost: AmortizedCost,
}

/// An L2 transaction awaiting settlement on L1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRecord {
    /// The record identifier.
    pub id: RecordId,
    /// The session tracking the record.
    pub session_id: SessionId,
    /// The hash of the L2 transaction.
    pub l2_tx_hash: TxHash,
    /// The L2 block including the transaction.
    pub l2_block_number: u64,
    /// Unix timestamp at which the transaction was confirmed on L2, in seconds.
    pub l2_confirmation_time: u64,
    /// The settlement the record was attributed to, if any.
    pub l1_settlement_info: Option<L1SettlementInfo>,
    /// The finality of the settlement, if any.
    pub finality_metrics: Option<FinalityMetrics>,
}

impl PendingRecord {
    /// Returns a new unsettled record.
    pub const fn new(
        id: RecordId,
        session_id: SessionId,
        l2_tx_hash: TxHash,
        meta: L2BlockMeta,
    ) -> Self {
        Self {
            id,
            session_id,
            l2_tx_hash,
            l2_block_number: meta.block_number,
            l2_confirmation_time: meta.confirmation_time,
            l1_settlement_info: None,
            finality_metrics: None,
        }
    }

    /// Returns true if the record was attributed to an L1 batch.
    pub const fn is_settled(&self) -> bool {
        self.l1_settlement_info.is_some()
    }
}
