use settlement_primitives::{NetworkId, SessionId};
use settlement_providers::ChainClientError;

/// An error that occurred while starting a monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The profile does not settle to the requested L1 network.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(NetworkId),
    /// A chain client could not be opened.
    #[error("connection error: {0}")]
    Connection(#[from] ChainClientError),
    /// The profile has no batch poster to watch.
    #[error("no batch poster known for {0}")]
    NoBatchPosters(NetworkId),
    /// The session is already monitored.
    #[error("{0} is already monitored")]
    AlreadyMonitoring(SessionId),
}

/// An error that failed a single poll tick. The monitor logs it and polls again on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum PollTickError {
    /// A block or receipt request failed.
    #[error(transparent)]
    ChainClient(#[from] ChainClientError),
    /// The L1 did not return a block below its head.
    #[error("missing L1 block {0}")]
    MissingBlock(u64),
}
