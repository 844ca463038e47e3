//! Attribution of pending records to detected batches.

use settlement_primitives::{DetectedBatch, PendingRecord};
use std::{fmt::Debug, time::Duration};

/// Decides which pending records a detected batch may settle.
///
/// Batches carry an estimated L2 range only, so attribution is a heuristic and a batch can
/// match several records.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait Correlator: Send + Sync + Debug {
    /// Returns true if the batch is a settlement candidate for the record.
    fn is_candidate(&self, record: &PendingRecord, batch: &DetectedBatch) -> bool;
}

/// Matches unsettled records confirmed on L2 strictly before the batch and less than `window`
/// before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowCorrelator {
    window: Duration,
}

impl TimeWindowCorrelator {
    /// Returns a new [`TimeWindowCorrelator`].
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl Correlator for TimeWindowCorrelator {
    fn is_candidate(&self, record: &PendingRecord, batch: &DetectedBatch) -> bool {
        if record.is_settled() || batch.l1_timestamp <= record.l2_confirmation_time {
            return false
        }
        batch.l1_timestamp - record.l2_confirmation_time < self.window.as_secs()
    }
}

/// Returns the time between the L2 confirmation of the record and the batch, in milliseconds.
pub fn settlement_time_ms(record: &PendingRecord, batch: &DetectedBatch) -> u64 {
    batch.l1_timestamp.saturating_sub(record.l2_confirmation_time).saturating_mul(1_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, TxHash};
    use settlement_primitives::{
        AmortizedCost, L1SettlementInfo, L2BlockMeta, L2BlockRange, RecordId, SessionId,
    };

    const DAY: u64 = 24 * 60 * 60;

    fn record(confirmed_at: u64) -> PendingRecord {
        let meta = L2BlockMeta { block_number: 10, confirmation_time: confirmed_at };
        PendingRecord::new(RecordId(1), SessionId(1), TxHash::repeat_byte(0xaa), meta)
    }

    fn batch(at: u64) -> DetectedBatch {
        DetectedBatch {
            l1_tx_hash: TxHash::repeat_byte(0xbb),
            l1_block_number: 100,
            l1_timestamp: at,
            l2_block_range: L2BlockRange::new(1, 50),
            gas_used: 100_000,
            gas_price: 1,
            poster_address: Address::ZERO,
        }
    }

    #[test]
    fn test_time_window_bounds() {
        let correlator = TimeWindowCorrelator::new(Duration::from_secs(DAY));
        let confirmed = 1_000_000;

        assert!(correlator.is_candidate(&record(confirmed), &batch(confirmed + 1)));
        assert!(correlator.is_candidate(&record(confirmed), &batch(confirmed + DAY - 1)));
        // both bounds are exclusive.
        assert!(!correlator.is_candidate(&record(confirmed), &batch(confirmed)));
        assert!(!correlator.is_candidate(&record(confirmed), &batch(confirmed + DAY)));
        assert!(!correlator.is_candidate(&record(confirmed), &batch(confirmed - 10)));
    }

    #[test]
    fn test_settled_record_is_not_a_candidate() {
        let correlator = TimeWindowCorrelator::new(Duration::from_secs(DAY));
        let mut settled = record(1_000);
        settled.l1_settlement_info = Some(L1SettlementInfo {
            l1_tx_hash: TxHash::ZERO,
            l1_block_number: 1,
            l1_timestamp: 1_100,
            settlement_time_ms: 100_000,
            l2_block_range: L2BlockRange::new(1, 1),
            estimated_batch_size: 1,
            cost: AmortizedCost::default(),
        });

        assert!(!correlator.is_candidate(&settled, &batch(1_200)));
    }

    #[test]
    fn test_settlement_time() {
        assert_eq!(settlement_time_ms(&record(1_000), &batch(1_090)), 90_000);
        assert_eq!(settlement_time_ms(&record(1_000), &batch(900)), 0);
    }
}
