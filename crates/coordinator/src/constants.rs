//! Defaults of the [`crate::CoordinatorConfig`].

use std::time::Duration;

/// The interval between two sweeps of expired sessions.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The shortest interval between two sweeps.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// The age past which a session is force-stopped by the sweep.
pub const DEFAULT_MAX_SESSION_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// The largest delay between an L2 confirmation and the L1 batch it is attributed to.
pub const DEFAULT_CORRELATION_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// The capacity of the event channel of a session.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// The USD price of the L1 native token used while the price oracle is unavailable.
pub const DEFAULT_FALLBACK_PRICE_USD: f64 = 3_000.0;

/// The number of retries of a failed connection health check.
pub const CONNECT_MAX_RETRIES: usize = 2;

/// The initial delay between two connection attempts, in milliseconds.
pub const CONNECT_INITIAL_DELAY_MS: u64 = 500;

/// The number of retries of a failed storage write.
pub const STORAGE_MAX_RETRIES: usize = 3;

/// The initial delay between two storage writes, in milliseconds.
pub const STORAGE_INITIAL_DELAY_MS: u64 = 50;
