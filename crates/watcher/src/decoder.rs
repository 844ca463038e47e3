//! Estimation of the L2 blocks covered by a batch transaction.
//!
//! Batch calldata and blobs are compressed in family specific formats which are not decoded.
//! Decoders estimate the covered range from the L2 head instead; the range is a correlation hint
//! and never ground truth.

use alloy_primitives::TxHash;
use settlement_primitives::{ChainTransaction, L2BlockRange, RollupFamily};
use settlement_providers::{ChainClient, ChainClientError};
use std::{fmt::Debug, sync::Arc};

/// An error that occurred while decoding a batch.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The L2 could not be queried.
    #[error("failed to query the L2: {0}")]
    L2(#[from] ChainClientError),
    /// The decoder cannot read the batch transaction.
    #[error("malformed batch transaction {tx_hash}: {reason}")]
    Malformed {
        /// The batch transaction.
        tx_hash: TxHash,
        /// What the decoder could not read.
        reason: String,
    },
}

impl DecodeError {
    /// Returns true if decoding the same transaction again may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::L2(_))
    }
}

/// Estimates the L2 block range of a batch transaction.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait BatchDecoder: Send + Sync + Debug {
    /// Returns the L2 blocks the batch is assumed to cover. Blob carrying transactions have
    /// empty calldata and must be supported.
    async fn decode_range(
        &self,
        tx: &ChainTransaction,
        l2: &dyn ChainClient,
    ) -> Result<L2BlockRange, DecodeError>;
}

/// A [`BatchDecoder`] assuming a batch covers the trailing `window` blocks of the L2 head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadWindowDecoder {
    window: u64,
}

impl HeadWindowDecoder {
    /// Returns a new [`HeadWindowDecoder`] covering `window` blocks, at least one.
    pub const fn new(window: u64) -> Self {
        Self { window: if window == 0 { 1 } else { window } }
    }

    /// Returns the decoder for the typical batch span of the family.
    pub const fn for_family(family: RollupFamily) -> Self {
        Self::new(family.typical_batch_blocks())
    }

    /// Returns the range ending at `head`. Starts at genesis when the chain is shorter than the
    /// window.
    pub const fn range_at(&self, head: u64) -> L2BlockRange {
        L2BlockRange::new(head.saturating_sub(self.window - 1), head)
    }
}

#[async_trait::async_trait]
impl BatchDecoder for HeadWindowDecoder {
    async fn decode_range(
        &self,
        _tx: &ChainTransaction,
        l2: &dyn ChainClient,
    ) -> Result<L2BlockRange, DecodeError> {
        let head = l2.block_number().await?;
        Ok(self.range_at(head))
    }
}

/// Returns the decoder of the rollup family.
pub fn decoder_for(family: RollupFamily) -> Arc<dyn BatchDecoder> {
    Arc::new(HeadWindowDecoder::for_family(family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use settlement_providers::test_utils::MockChainClient;

    fn batch_tx() -> ChainTransaction {
        ChainTransaction { input: Bytes::from_static(&[0x01]), ..Default::default() }
    }

    #[test]
    fn test_range_at_head() {
        let decoder = HeadWindowDecoder::for_family(RollupFamily::Arbitrum);
        assert_eq!(decoder.range_at(1_000), L2BlockRange::new(901, 1_000));
        assert_eq!(decoder.range_at(100), L2BlockRange::new(1, 100));
        assert_eq!(decoder.range_at(99), L2BlockRange::new(0, 99));
        assert_eq!(decoder.range_at(0), L2BlockRange::new(0, 0));

        assert_eq!(HeadWindowDecoder::new(0).range_at(7), L2BlockRange::new(7, 7));
    }

    #[tokio::test]
    async fn test_decode_reads_l2_head() -> eyre::Result<()> {
        let l2 = MockChainClient::new(5_000);

        let range = decoder_for(RollupFamily::OpStack).decode_range(&batch_tx(), &l2).await?;
        assert_eq!(range, L2BlockRange::new(4_951, 5_000));
        assert_eq!(range.len(), 50);

        let range = decoder_for(RollupFamily::Linea).decode_range(&batch_tx(), &l2).await?;
        assert_eq!(range.len(), 200);
        Ok(())
    }

    #[tokio::test]
    async fn test_decode_blob_transaction_without_calldata() -> eyre::Result<()> {
        let l2 = MockChainClient::new(5_000);
        let decoder = HeadWindowDecoder::for_family(RollupFamily::OpStack);

        let range = decoder.decode_range(&ChainTransaction::default(), &l2).await?;
        assert_eq!(range, L2BlockRange::new(4_951, 5_000));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_l2_is_retryable() {
        let l2 = MockChainClient::new(5_000);
        let decoder = HeadWindowDecoder::for_family(RollupFamily::Scroll);

        l2.set_unreachable(true);
        let err = decoder.decode_range(&batch_tx(), &l2).await.unwrap_err();
        assert!(matches!(err, DecodeError::L2(_)));
        assert!(err.is_retryable());

        let err =
            DecodeError::Malformed { tx_hash: TxHash::ZERO, reason: "unknown version".into() };
        assert!(!err.is_retryable());
    }
}
