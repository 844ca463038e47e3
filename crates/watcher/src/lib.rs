//! L1 batch monitor for the settlement tracker.

mod cache;
use cache::SeenBatches;

pub mod constants;

mod decoder;
pub use decoder::{decoder_for, BatchDecoder, DecodeError, HeadWindowDecoder};

mod error;
pub use error::{MonitorError, PollTickError};

mod handler;
pub use handler::BatchHandler;

mod metrics;
pub use metrics::MonitorMetrics;

mod service;
pub use service::BatchMonitorService;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;

use settlement_primitives::{ChainTransaction, DetectedBatch, RollupProfile, SessionId};
use settlement_providers::{with_timeout, ChainClient, ChainClientError};
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// The configuration of a [`BatchMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// The interval between two poll ticks.
    pub poll_interval: Duration,
    /// The number of trailing L1 blocks scanned per tick.
    pub scan_depth: u64,
    /// The timeout of a single RPC call.
    pub rpc_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: constants::DEFAULT_POLL_INTERVAL,
            scan_depth: constants::DEFAULT_SCAN_DEPTH,
            rpc_timeout: constants::DEFAULT_RPC_TIMEOUT,
        }
    }
}

impl MonitorConfig {
    /// Returns the poll interval, at least [`constants::MIN_POLL_INTERVAL`].
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(constants::MIN_POLL_INTERVAL)
    }

    /// Returns the scan depth, clamped to the supported range.
    pub const fn effective_scan_depth(&self) -> u64 {
        if self.scan_depth < constants::MIN_SCAN_DEPTH {
            constants::MIN_SCAN_DEPTH
        } else if self.scan_depth > constants::MAX_SCAN_DEPTH {
            constants::MAX_SCAN_DEPTH
        } else {
            self.scan_depth
        }
    }
}

/// The batch monitor of a session polls the trailing blocks of the L1 for transactions sent by
/// the batch posters of a rollup, and hands each new batch to a [`BatchHandler`].
#[derive(Debug)]
pub struct BatchMonitor<H> {
    /// The monitored session.
    session_id: SessionId,
    /// The profile of the rollup, with the session's batch posters.
    profile: Arc<RollupProfile>,
    /// The L1 client.
    l1: Arc<dyn ChainClient>,
    /// The L2 client, queried by the decoder.
    l2: Arc<dyn ChainClient>,
    /// The decoder of the rollup family.
    decoder: Arc<dyn BatchDecoder>,
    /// The consumer of detected batches.
    handler: H,
    /// The monitor configuration.
    config: MonitorConfig,
    /// The batch transactions already handed to the handler.
    seen: SeenBatches,
    /// The metrics for the monitor.
    metrics: MonitorMetrics,
}

impl<H: BatchHandler> BatchMonitor<H> {
    /// Returns a new [`BatchMonitor`] for the session.
    pub fn new(
        session_id: SessionId,
        profile: Arc<RollupProfile>,
        l1: Arc<dyn ChainClient>,
        l2: Arc<dyn ChainClient>,
        handler: H,
        config: MonitorConfig,
    ) -> Self {
        Self {
            session_id,
            decoder: decoder_for(profile.family),
            profile,
            l1,
            l2,
            handler,
            config,
            seen: SeenBatches::new(constants::SEEN_BATCHES_CAPACITY),
            metrics: MonitorMetrics::default(),
        }
    }

    /// Replaces the decoder of the monitor.
    pub fn with_decoder(mut self, decoder: Arc<dyn BatchDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Main execution loop for the [`BatchMonitor`]. Ticks every poll interval until cancelled.
    ///
    /// A tick in progress when the token is cancelled is abandoned at its next await point.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(target: "settlement::watcher", session = %self.session_id, network = %self.profile.network_id, posters = self.profile.batch_poster_addresses.len(), "starting batch monitor");

        let mut interval = tokio::time::interval(self.config.effective_poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            self.metrics.ticks.increment(1);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.step() => match result {
                    Ok(detected) => {
                        tracing::trace!(target: "settlement::watcher", session = %self.session_id, detected, "poll tick completed");
                    }
                    Err(err) => {
                        self.metrics.failed_ticks.increment(1);
                        tracing::error!(target: "settlement::watcher", session = %self.session_id, %err, "poll tick failed, skipping");
                    }
                }
            }
        }

        tracing::info!(target: "settlement::watcher", session = %self.session_id, "batch monitor stopped");
    }

    /// A step of work for the [`BatchMonitor`]: scans the trailing L1 blocks and hands the new
    /// batches to the handler. Returns the number of batches handled.
    #[tracing::instrument(
        target = "settlement::watcher",
        skip_all,
        fields(session = %self.session_id, network = %self.profile.network_id)
    )]
    pub async fn step(&mut self) -> Result<usize, PollTickError> {
        let timeout = self.config.rpc_timeout;
        let head = with_timeout(timeout, self.l1.block_number()).await?;
        let from = head.saturating_sub(self.config.effective_scan_depth() - 1);
        tracing::trace!(target: "settlement::watcher", from, head, "scanning L1 blocks");

        let mut detected = 0;
        for number in from..=head {
            let block = with_timeout(timeout, self.l1.block_by_number(number, true))
                .await?
                .ok_or(PollTickError::MissingBlock(number))?;

            let candidates: Vec<ChainTransaction> = block
                .transactions
                .into_iter()
                .filter(|tx| {
                    self.profile.is_batch_poster(&tx.from) && !self.seen.contains(&tx.hash)
                })
                .collect();

            for tx in candidates {
                let maybe_batch = self.detect_batch(&tx, block.number, block.timestamp).await?;
                let Some(batch) = maybe_batch else { continue };
                tracing::debug!(target: "settlement::watcher", l1_tx_hash = ?batch.l1_tx_hash, l1_block = batch.l1_block_number, l2_range = %batch.l2_block_range, "detected batch");

                self.handler.handle_batch(batch).await;
                self.seen.insert(tx.hash);
                self.metrics.batches_detected.increment(1);
                detected += 1;
            }
        }

        Ok(detected)
    }

    /// Returns the batch posted by the transaction, or `None` if its receipt is missing or
    /// reverted, or its L2 range could not be decoded.
    async fn detect_batch(
        &mut self,
        tx: &ChainTransaction,
        l1_block_number: u64,
        l1_timestamp: u64,
    ) -> Result<Option<DetectedBatch>, PollTickError> {
        let timeout = self.config.rpc_timeout;
        let Some(receipt) = with_timeout(timeout, self.l1.transaction_receipt(tx.hash)).await?
        else {
            tracing::debug!(target: "settlement::watcher", tx_hash = ?tx.hash, "missing receipt for poster transaction, skipping");
            self.metrics.skipped_transactions.increment(1);
            return Ok(None)
        };
        if !receipt.success {
            tracing::debug!(target: "settlement::watcher", tx_hash = ?tx.hash, "poster transaction reverted, skipping");
            self.metrics.skipped_transactions.increment(1);
            // a reverted transaction stays reverted.
            self.seen.insert(tx.hash);
            return Ok(None)
        }

        let decoded = tokio::time::timeout(timeout, self.decoder.decode_range(tx, &*self.l2))
            .await
            .unwrap_or(Err(DecodeError::L2(ChainClientError::Timeout(timeout))));
        let l2_block_range = match decoded {
            Ok(range) => range,
            Err(err) => {
                self.metrics.failed_decodes.increment(1);
                if err.is_retryable() {
                    tracing::warn!(target: "settlement::watcher", tx_hash = ?tx.hash, %err, "failed to decode batch, retrying next tick");
                } else {
                    tracing::warn!(target: "settlement::watcher", tx_hash = ?tx.hash, %err, "failed to decode batch, skipping");
                    self.seen.insert(tx.hash);
                }
                return Ok(None)
            }
        };
        let gas_price = if receipt.effective_gas_price > 0 {
            receipt.effective_gas_price
        } else {
            tx.gas_price.unwrap_or_default()
        };

        Ok(Some(DetectedBatch {
            l1_tx_hash: tx.hash,
            l1_block_number,
            l1_timestamp,
            l2_block_range,
            gas_used: receipt.gas_used,
            gas_price,
            poster_address: tx.from,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingBatchHandler;

    use alloy_primitives::{Address, Bytes, TxHash};
    use settlement_primitives::{known_networks, L2BlockRange, RollupRegistry};
    use settlement_providers::test_utils::MockChainClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const POSTER: Address = Address::repeat_byte(0x11);

    // Returns an L1 at block 100, an L2 at block 5000 and a handler recording batches.
    fn chains() -> (MockChainClient, MockChainClient, RecordingBatchHandler) {
        (MockChainClient::new(100), MockChainClient::new(5_000), RecordingBatchHandler::default())
    }

    // Returns a monitor on an arbitrum sepolia profile posting from `POSTER`.
    fn monitor(
        l1: &MockChainClient,
        l2: &MockChainClient,
        handler: &RecordingBatchHandler,
    ) -> BatchMonitor<RecordingBatchHandler> {
        let profile = RollupRegistry::builtin()
            .get(&known_networks::ARBITRUM_SEPOLIA.into())
            .unwrap()
            .with_batch_posters([POSTER]);
        BatchMonitor::new(
            SessionId(1),
            Arc::new(profile),
            Arc::new(l1.clone()),
            Arc::new(l2.clone()),
            handler.clone(),
            MonitorConfig::default(),
        )
    }

    #[test]
    fn test_scan_depth_is_clamped() {
        let config = |scan_depth| MonitorConfig { scan_depth, ..Default::default() };
        assert_eq!(config(0).effective_scan_depth(), 5);
        assert_eq!(config(8).effective_scan_depth(), 8);
        assert_eq!(config(64).effective_scan_depth(), 10);
    }

    #[tokio::test]
    async fn test_should_emit_zero_batches_without_poster_transactions() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(98, Address::repeat_byte(0x22), true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        let detected = monitor.step().await?;

        // Then
        assert_eq!(detected, 0);
        assert!(handler.batches().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_emit_poster_batches_once() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        let hash = l1.insert_transaction(97, POSTER, true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        monitor.step().await?;
        l1.set_head(101);
        monitor.step().await?;

        // Then
        let batches = handler.batches();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.l1_tx_hash, hash);
        assert_eq!(batch.l1_block_number, 97);
        assert_eq!(batch.l1_timestamp, 97 * 12);
        assert_eq!(batch.l2_block_range, L2BlockRange::new(4_901, 5_000));
        assert_eq!(batch.gas_used, 150_000);
        assert_eq!(batch.poster_address, POSTER);
        Ok(())
    }

    #[tokio::test]
    async fn test_should_skip_blocks_outside_scan_window() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(92, POSTER, true, &[]);
        l1.insert_transaction(93, POSTER, true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        let detected = monitor.step().await?;

        // Then
        assert_eq!(detected, 1);
        assert_eq!(handler.batches()[0].l1_block_number, 93);
        Ok(())
    }

    #[tokio::test]
    async fn test_should_skip_reverted_and_missing_receipts() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(99, POSTER, false, &[]);
        let pending = l1.insert_transaction(100, POSTER, true, &[]);
        l1.remove_receipt(&pending);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        let detected = monitor.step().await?;

        // Then
        assert_eq!(detected, 0);
        assert!(handler.batches().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_emit_blob_batches_without_calldata() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        let blob = l1.insert_transaction_with_input(99, POSTER, true, &[], Bytes::new());
        let calldata = l1.insert_transaction(100, POSTER, true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        let detected = monitor.step().await?;

        // Then
        assert_eq!(detected, 2);
        let hashes: Vec<_> = handler.batches().iter().map(|batch| batch.l1_tx_hash).collect();
        assert_eq!(hashes, vec![blob, calldata]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_decode_skips_only_its_transaction() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        let first = l1.insert_transaction(99, POSTER, true, &[]);
        let second = l1.insert_transaction(100, POSTER, true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        l2.fail_next_requests(1);
        let detected = monitor.step().await?;

        // Then
        assert_eq!(detected, 1);
        assert_eq!(handler.batches()[0].l1_tx_hash, second);

        // the failed batch is decoded again on the next tick.
        assert_eq!(monitor.step().await?, 1);
        assert_eq!(handler.batches()[1].l1_tx_hash, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_batch_is_not_decoded_again() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        let malformed = l1.insert_transaction(99, POSTER, true, &[]);
        let valid = l1.insert_transaction(100, POSTER, true, &[]);
        let decoder = RejectingDecoder { rejected: malformed, calls: Arc::default() };
        let calls = decoder.calls.clone();
        let mut monitor = monitor(&l1, &l2, &handler).with_decoder(Arc::new(decoder));

        // When
        assert_eq!(monitor.step().await?, 1);
        assert_eq!(monitor.step().await?, 0);

        // Then
        assert_eq!(handler.batches().len(), 1);
        assert_eq!(handler.batches()[0].l1_tx_hash, valid);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_l2_defers_batches_until_recovery() -> eyre::Result<()> {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(100, POSTER, true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        l2.set_unreachable(true);
        let detected = monitor.step().await?;

        // Then
        assert_eq!(detected, 0);
        assert!(handler.batches().is_empty());

        // the batch is emitted once the L2 recovers.
        l2.set_unreachable(false);
        assert_eq!(monitor.step().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_l1_request_fails_the_tick() {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(100, POSTER, true, &[]);
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        l1.set_unreachable(true);
        let err = monitor.step().await.unwrap_err();

        // Then
        assert!(matches!(err, PollTickError::ChainClient(_)));
        assert!(handler.batches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_request_fails_the_tick() {
        // Given
        let (l1, l2, handler) = chains();
        l1.set_latency(Some(Duration::from_secs(60)));
        let mut monitor = monitor(&l1, &l2, &handler);

        // When
        let err = monitor.step().await.unwrap_err();

        // Then
        assert!(matches!(err, PollTickError::ChainClient(ChainClientError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failed_ticks_until_cancelled() {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(100, POSTER, true, &[]);
        l1.fail_next_requests(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(monitor(&l1, &l2, &handler).run(cancel.clone()));

        // When
        tokio::time::sleep(constants::DEFAULT_POLL_INTERVAL * 2).await;
        cancel.cancel();
        task.await.unwrap();

        // Then
        assert_eq!(handler.batches().len(), 1);
        let requests = l1.request_count();
        tokio::time::sleep(constants::DEFAULT_POLL_INTERVAL * 4).await;
        assert_eq!(l1.request_count(), requests);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_zero_poll_interval() {
        // Given
        let (l1, l2, handler) = chains();
        l1.insert_transaction(100, POSTER, true, &[]);
        let config = MonitorConfig { poll_interval: Duration::ZERO, ..Default::default() };
        assert_eq!(config.effective_poll_interval(), constants::MIN_POLL_INTERVAL);
        let monitor = BatchMonitor::new(
            SessionId(1),
            monitor(&l1, &l2, &handler).profile,
            Arc::new(l1.clone()),
            Arc::new(l2.clone()),
            handler.clone(),
            config,
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(monitor.run(cancel.clone()));

        // When
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        // Then
        assert!(task.await.is_ok());
        assert_eq!(handler.batches().len(), 1);
    }

    /// Rejects one transaction as malformed and counts its calls.
    #[derive(Debug)]
    struct RejectingDecoder {
        rejected: TxHash,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl BatchDecoder for RejectingDecoder {
        async fn decode_range(
            &self,
            tx: &ChainTransaction,
            l2: &dyn ChainClient,
        ) -> Result<L2BlockRange, DecodeError> {
            if tx.hash != self.rejected {
                return HeadWindowDecoder::new(100).decode_range(tx, l2).await
            }
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(DecodeError::Malformed { tx_hash: tx.hash, reason: "unknown batch version".into() })
        }
    }
}
