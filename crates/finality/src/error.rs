use settlement_primitives::NetworkId;
use settlement_providers::ChainClientError;

/// An error occurring while calculating the finality of a batch.
#[derive(Debug, thiserror::Error)]
pub enum FinalityError {
    /// No rollup profile exists for the network.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(NetworkId),
    /// The L1 chain could not be queried.
    #[error(transparent)]
    ChainClient(#[from] ChainClientError),
}
