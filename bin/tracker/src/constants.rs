//! Defaults of the tracker arguments.

/// The L1 network tracked by default.
pub const DEFAULT_L1_NETWORK: &str = "sepolia";

/// The L2 network tracked by default.
pub const DEFAULT_L2_NETWORK: &str = "base-sepolia";

/// The monitoring duration of the session, in hours.
pub const DEFAULT_SESSION_DURATION_HOURS: f64 = 1.0;

/// The max retries of a rate limited RPC request.
pub const PROVIDER_MAX_RETRIES: u32 = 10;

/// The initial backoff of a rate limited RPC request, in milliseconds.
pub const PROVIDER_INITIAL_BACKOFF: u64 = 100;

/// The default provider compute units per second.
pub const PROVIDER_COMPUTE_UNITS_PER_SECOND: u64 = 10_000;
