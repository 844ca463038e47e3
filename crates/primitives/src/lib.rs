//! Primitive types for the settlement finality tracker.

pub use abi::{
    BlockCommit, BlocksVerification, CommitBatch, DataFinalizedV3, DataSubmittedV3, FinalizeBatch,
    SequenceBatches, VerifyBatchesTrustedAggregator,
};
mod abi;

pub use batch::{DetectedBatch, L2BlockRange};
mod batch;

pub use chain::{ChainBlock, ChainReceipt, ChainTransaction, ReceiptLog};
mod chain;

pub use cost::{AmortizedCost, PriceSource};
mod cost;

pub use error::SessionTransitionError;
mod error;

pub use finality::{FinalityMetrics, FinalityStatus, SecurityLevel};
mod finality;

pub use network::{known_networks, NetworkId};
mod network;

pub use profile::{ConfirmationThresholds, RollupFamily, RollupProfile, SecurityModel};
mod profile;

pub use record::{L1SettlementInfo, L2BlockMeta, PendingRecord, RecordId};
mod record;

pub use registry::{RollupRegistry, OPTIMISTIC_CHALLENGE_PERIOD_HOURS};
mod registry;

pub use session::{SessionConfig, SessionId, SessionStatus, TrackingSession};
mod session;

/// The number of seconds in an hour.
pub const SECONDS_PER_HOUR: u64 = 3_600;
