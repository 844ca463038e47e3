use crate::{constants, Retry};

use settlement_watcher::MonitorConfig;
use std::time::Duration;

/// Configuration for the session coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// The configuration of the batch monitors.
    pub monitor: MonitorConfig,
    /// The interval between two sweeps of expired sessions.
    pub sweep_interval: Duration,
    /// The age past which the sweep force-stops a session, whatever its monitoring duration.
    pub max_session_age: Duration,
    /// The largest delay between an L2 confirmation and the L1 batch it is attributed to.
    pub correlation_window: Duration,
    /// The capacity of the event channel of a session. Slow subscribers lose the oldest events.
    pub event_buffer: usize,
    /// The USD price of the L1 native token used while the price oracle is unavailable.
    pub fallback_price_usd: f64,
    /// The retry policy of the connection health checks at session start.
    pub connect_retry: Retry,
    /// The retry policy of storage writes during correlation.
    pub storage_retry: Retry,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            sweep_interval: constants::DEFAULT_SWEEP_INTERVAL,
            max_session_age: constants::DEFAULT_MAX_SESSION_AGE,
            correlation_window: constants::DEFAULT_CORRELATION_WINDOW,
            event_buffer: constants::DEFAULT_EVENT_BUFFER,
            fallback_price_usd: constants::DEFAULT_FALLBACK_PRICE_USD,
            connect_retry: Retry::new(
                Some(constants::CONNECT_MAX_RETRIES),
                constants::CONNECT_INITIAL_DELAY_MS,
                true,
            ),
            storage_retry: Retry::new(
                Some(constants::STORAGE_MAX_RETRIES),
                constants::STORAGE_INITIAL_DELAY_MS,
                true,
            ),
        }
    }
}
