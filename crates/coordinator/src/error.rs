use settlement_db::DatabaseError;
use settlement_primitives::{NetworkId, SessionId, SessionStatus};
use settlement_providers::ChainClientError;
use settlement_watcher::MonitorError;

/// An error returned by the [`crate::SessionCoordinator`].
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The network has no rollup profile, or the rollup does not settle to the requested L1.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(NetworkId),
    /// Neither the rollup profile nor the session names a batch poster.
    #[error("no batch poster known for {0}")]
    MissingBatchPosters(NetworkId),
    /// A chain client could not be opened or failed its health check.
    #[error("connection error: {0}")]
    Connection(ChainClientError),
    /// The session was never started.
    #[error("{0} not found")]
    SessionNotFound(SessionId),
    /// The session no longer accepts transactions.
    #[error("{session_id} is not monitoring, status: {status}")]
    SessionNotActive {
        /// The session.
        session_id: SessionId,
        /// The current status of the session.
        status: SessionStatus,
    },
    /// A storage operation failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The batch monitor could not be started.
    #[error(transparent)]
    Monitor(MonitorError),
}

impl From<MonitorError> for CoordinatorError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::UnsupportedNetwork(network) => Self::UnsupportedNetwork(network),
            MonitorError::Connection(err) => Self::Connection(err),
            MonitorError::NoBatchPosters(network) => Self::MissingBatchPosters(network),
            err @ MonitorError::AlreadyMonitoring(_) => Self::Monitor(err),
        }
    }
}
