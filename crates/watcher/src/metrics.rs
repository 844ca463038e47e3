use metrics::Counter;
use metrics_derive::Metrics;

/// The metrics for the [`super::BatchMonitor`].
#[derive(Metrics)]
#[metrics(scope = "batch_monitor")]
pub struct MonitorMetrics {
    /// A counter on the poll ticks.
    pub ticks: Counter,
    /// A counter on the poll ticks which failed.
    pub failed_ticks: Counter,
    /// A counter on the batches detected.
    pub batches_detected: Counter,
    /// A counter on the poster transactions skipped for a missing or failed receipt.
    pub skipped_transactions: Counter,
    /// A counter on the poster transactions whose L2 range could not be decoded.
    pub failed_decodes: Counter,
}
