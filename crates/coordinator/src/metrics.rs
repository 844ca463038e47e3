use metrics::Counter;
use metrics_derive::Metrics;

/// The metrics for the [`super::SessionCoordinator`].
#[derive(Metrics)]
#[metrics(scope = "session_coordinator")]
pub struct CoordinatorMetrics {
    /// A counter on the sessions started.
    pub sessions_started: Counter,
    /// A counter on the sessions which failed to connect.
    pub sessions_failed: Counter,
    /// A counter on the sessions completed by duration or by a stop request.
    pub sessions_completed: Counter,
    /// A counter on the sessions force-stopped by the sweep.
    pub sessions_timed_out: Counter,
    /// A counter on the pending records registered.
    pub records_registered: Counter,
    /// A counter on the pending records attributed to a batch.
    pub records_correlated: Counter,
    /// A counter on the batches matching more than one pending record.
    pub ambiguous_correlations: Counter,
    /// A counter on the events lost by lagging subscribers.
    pub events_dropped: Counter,
}
