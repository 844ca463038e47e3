use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};
use settlement_primitives::{SessionId, SessionStatus};

/// An event pushed to the subscribers of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A batch was detected on L1 and correlated with the pending records of the session.
    BatchDetected(BatchDetectedEvent),
    /// The session left `monitoring`. Always the last event of a stream.
    SessionEnded(SessionEndedEvent),
}

impl SessionEvent {
    /// Returns the session the event belongs to.
    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::BatchDetected(event) => event.session_id,
            Self::SessionEnded(event) => event.session_id,
        }
    }
}

/// A batch detected for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetectedEvent {
    /// The session.
    pub session_id: SessionId,
    /// The hash of the L1 batch transaction.
    pub l1_tx_hash: TxHash,
    /// The first block of the estimated L2 range.
    pub l2_block_start: u64,
    /// The last block of the estimated L2 range.
    pub l2_block_end: u64,
    /// The number of pending records attributed to the batch.
    pub transaction_count: usize,
    /// The mean settlement time of the attributed records, in milliseconds. Zero when no
    /// record was attributed.
    pub settlement_time_ms: u64,
    /// The total cost of the batch transaction, in USD.
    #[serde(rename = "l1CostUSD")]
    pub l1_cost_usd: f64,
    /// The cost attributed to a single L2 transaction, in USD.
    #[serde(rename = "amortizedCostPerTxUSD")]
    pub amortized_cost_per_tx_usd: f64,
    /// The finality confidence of the batch, between 0 and 100.
    pub finality_confidence: u8,
}

/// The end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedEvent {
    /// The session.
    pub session_id: SessionId,
    /// The terminal status of the session.
    pub status: SessionStatus,
}
