use std::{num::NonZeroUsize, time::Duration};

/// The default interval between two poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// The shortest interval between two poll ticks.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// The default number of trailing L1 blocks scanned per tick.
pub const DEFAULT_SCAN_DEPTH: u64 = 8;

/// The smallest number of trailing L1 blocks scanned per tick.
pub const MIN_SCAN_DEPTH: u64 = 5;

/// The largest number of trailing L1 blocks scanned per tick.
pub const MAX_SCAN_DEPTH: u64 = 10;

/// The default timeout of a single RPC call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// The number of emitted batch transactions remembered to skip overlapping scan windows.
pub const SEEN_BATCHES_CAPACITY: NonZeroUsize =
    NonZeroUsize::new(256).expect("non zero capacity");
