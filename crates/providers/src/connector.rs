use crate::{AlloyChainClient, ChainClient, ChainClientError};

use alloy_network::Ethereum;
use alloy_provider::ProviderBuilder;
use alloy_rpc_client::RpcClient;
use alloy_transport::layers::RetryBackoffLayer;
use reqwest::Url;
use settlement_primitives::NetworkId;
use std::{collections::HashMap, fmt::Debug, sync::Arc};

/// Opens [`ChainClient`]s to networks.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait ChainConnector: Send + Sync + Debug {
    /// Returns a client reading from the network.
    async fn connect(&self, network: &NetworkId) -> Result<Arc<dyn ChainClient>, ChainClientError>;
}

/// The retry policy of the transports built by the [`HttpConnector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRetryConfig {
    /// The maximum number of retries of a rate limited request.
    pub max_retries: u32,
    /// The initial backoff, in milliseconds.
    pub initial_backoff: u64,
    /// The compute units per second allowed by the endpoint.
    pub compute_units_per_second: u64,
}

impl Default for TransportRetryConfig {
    fn default() -> Self {
        Self { max_retries: 10, initial_backoff: 100, compute_units_per_second: 10_000 }
    }
}

/// A [`ChainConnector`] building HTTP providers from a map of network endpoints.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    endpoints: HashMap<NetworkId, Url>,
    retry: TransportRetryConfig,
}

impl HttpConnector {
    /// Returns a new [`HttpConnector`] with the provided transport retry policy.
    pub fn new(retry: TransportRetryConfig) -> Self {
        Self { endpoints: HashMap::new(), retry }
    }

    /// Registers the endpoint of a network.
    pub fn with_endpoint(mut self, network: impl Into<NetworkId>, url: Url) -> Self {
        self.endpoints.insert(network.into(), url);
        self
    }

    /// Returns the endpoint of the network, if configured.
    pub fn endpoint(&self, network: &NetworkId) -> Option<&Url> {
        self.endpoints.get(network)
    }
}

#[async_trait::async_trait]
impl ChainConnector for HttpConnector {
    async fn connect(&self, network: &NetworkId) -> Result<Arc<dyn ChainClient>, ChainClientError> {
        let Some(url) = self.endpoints.get(network).cloned() else {
            return Err(ChainClientError::Connection {
                network: network.clone(),
                reason: "no endpoint configured".to_string(),
            })
        };
        tracing::debug!(target: "settlement::providers", %network, %url, "connecting");

        let TransportRetryConfig { max_retries, initial_backoff, compute_units_per_second } =
            self.retry;
        let client = RpcClient::builder()
            .layer(RetryBackoffLayer::new(max_retries, initial_backoff, compute_units_per_second))
            .http(url);
        let provider = ProviderBuilder::<_, _, Ethereum>::default().connect_client(client);

        Ok(Arc::new(AlloyChainClient::new(network.clone(), provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_without_endpoint_fails() {
        let connector = HttpConnector::default()
            .with_endpoint("sepolia", "http://localhost:8545".parse().unwrap());
        assert!(connector.endpoint(&"sepolia".into()).is_some());

        let err = connector.connect(&"arbitrum-sepolia".into()).await.unwrap_err();
        assert!(matches!(err, ChainClientError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let connector = HttpConnector::default()
            .with_endpoint("Sepolia", "http://localhost:8545".parse().unwrap());

        // building the provider does not reach the endpoint.
        let client = connector.connect(&"sepolia".into()).await;
        assert!(client.is_ok());
    }
}
