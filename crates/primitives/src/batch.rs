use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// An estimated, inclusive range of L2 blocks settled by a batch.
///
/// The range is produced by a best-effort decoder and is a correlation hint only, it is never
/// the exact membership of the batch.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "camelCase")]
pub struct L2BlockRange {
    /// The first L2 block of the range.
    pub start: u64,
    /// The last L2 block of the range.
    pub end: u64,
}

impl L2BlockRange {
    /// Returns a new [`L2BlockRange`]. The bounds are swapped if provided in reverse order.
    pub const fn new(start: u64, end: u64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Returns the number of blocks in the range.
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Ranges always hold at least one block.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if the block number falls in the range.
    pub const fn contains(&self, number: u64) -> bool {
        self.start <= number && number <= self.end
    }
}

impl core::fmt::Display for L2BlockRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}..={}]", self.start, self.end)
    }
}

/// A batch-poster transaction detected on L1.
///
/// Produced by the batch monitor and consumed immediately by the session coordinator; it is
/// never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "camelCase")]
pub struct DetectedBatch {
    /// The hash of the L1 batch transaction.
    pub l1_tx_hash: TxHash,
    /// The L1 block the batch was included in.
    pub l1_block_number: u64,
    /// The timestamp of the L1 block, in seconds.
    pub l1_timestamp: u64,
    /// The estimated L2 block range settled by the batch.
    pub l2_block_range: L2BlockRange,
    /// The gas used by the batch transaction.
    pub gas_used: u64,
    /// The effective gas price paid by the batch transaction, in wei.
    pub gas_price: u128,
    /// The batch poster which sent the transaction.
    pub poster_address: Address,
}

impl core::fmt::Display for DetectedBatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "DetectedBatch {{ l1_tx_hash: {}, l1_block_number: {}, l2_block_range: {} }}",
            self.l1_tx_hash, self.l1_block_number, self.l2_block_range
        )
    }
}

#[cfg(test)]
mod tests {
    use super::L2BlockRange;

    #[test]
    fn test_range_orders_bounds() {
        let range = L2BlockRange::new(120, 21);
        assert_eq!(range, L2BlockRange { start: 21, end: 120 });
        assert_eq!(range.len(), 100);
        assert!(range.contains(21));
        assert!(range.contains(120));
        assert!(!range.contains(121));
    }
}
