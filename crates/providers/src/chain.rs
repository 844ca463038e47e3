//! The read-only chain capability consumed by the monitor and the finality calculator.

use alloy_consensus::Transaction as _;
use alloy_network::{ReceiptResponse, TransactionResponse};
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use alloy_rpc_types_eth::{Block, BlockNumberOrTag, Transaction, TransactionReceipt};
use alloy_transport::{RpcError, TransportErrorKind};
use settlement_primitives::{ChainBlock, ChainReceipt, ChainTransaction, NetworkId, ReceiptLog};
use std::{fmt::Debug, future::Future, time::Duration};

/// An error occurring while querying a chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    /// The RPC request failed.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The chain did not return a block it should know about.
    #[error("missing block {0}")]
    MissingBlock(u64),
    /// No connection to the network could be established.
    #[error("failed to connect to {network}: {reason}")]
    Connection {
        /// The network.
        network: NetworkId,
        /// The reason of the failure.
        reason: String,
    },
}

/// Read access to an EVM chain.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ChainClient: Send + Sync + Debug {
    /// Returns the number of the latest block.
    async fn block_number(&self) -> Result<u64, ChainClientError>;

    /// Returns the block at the provided height, with its transactions if `include_txs` is set.
    async fn block_by_number(
        &self,
        number: u64,
        include_txs: bool,
    ) -> Result<Option<ChainBlock>, ChainClientError>;

    /// Returns the receipt of the provided transaction, if it was included.
    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ChainReceipt>, ChainClientError>;
}

/// Awaits `fut`, failing with [`ChainClientError::Timeout`] if it takes longer than `duration`.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T, ChainClientError>
where
    F: Future<Output = Result<T, ChainClientError>>,
{
    tokio::time::timeout(duration, fut).await.map_err(|_| ChainClientError::Timeout(duration))?
}

/// A [`ChainClient`] backed by an alloy [`Provider`].
pub struct AlloyChainClient<P> {
    network: NetworkId,
    provider: P,
}

impl<P> AlloyChainClient<P> {
    /// Returns a new [`AlloyChainClient`] for the network.
    pub const fn new(network: NetworkId, provider: P) -> Self {
        Self { network, provider }
    }

    /// Returns the network the client reads from.
    pub const fn network(&self) -> &NetworkId {
        &self.network
    }
}

impl<P> Debug for AlloyChainClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainClient").field("network", &self.network).finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<P> ChainClient for AlloyChainClient<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_by_number(
        &self,
        number: u64,
        include_txs: bool,
    ) -> Result<Option<ChainBlock>, ChainClientError> {
        let request = self.provider.get_block_by_number(BlockNumberOrTag::Number(number));
        let block = if include_txs { request.full().await? } else { request.await? };
        Ok(block.map(into_chain_block))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ChainReceipt>, ChainClientError> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(into_chain_receipt))
    }
}

fn into_chain_block(block: Block) -> ChainBlock {
    ChainBlock {
        number: block.header.number,
        hash: block.header.hash,
        timestamp: block.header.timestamp,
        transactions: block.transactions.txns().map(into_chain_transaction).collect(),
    }
}

fn into_chain_transaction(tx: &Transaction) -> ChainTransaction {
    ChainTransaction {
        hash: TransactionResponse::tx_hash(tx),
        from: TransactionResponse::from(tx),
        to: tx.to(),
        input: tx.input().clone(),
        gas_price: tx.effective_gas_price.or_else(|| alloy_consensus::Transaction::gas_price(tx)),
    }
}

fn into_chain_receipt(receipt: TransactionReceipt) -> ChainReceipt {
    ChainReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default(),
        success: ReceiptResponse::status(&receipt),
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| ReceiptLog { address: log.address(), topics: log.topics().to_vec() })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockChainClient;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout() {
        let client = MockChainClient::new(5);
        client.set_latency(Some(Duration::from_secs(30)));
        let err = with_timeout(Duration::from_secs(10), client.block_number()).await.unwrap_err();
        assert!(matches!(err, ChainClientError::Timeout(_)));

        client.set_latency(None);
        assert_eq!(with_timeout(Duration::from_secs(10), client.block_number()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_mock_hides_transactions_unless_requested() -> eyre::Result<()> {
        let client = MockChainClient::new(10);
        let hash = client.insert_transaction(9, Default::default(), true, &[]);

        let block = client.block_by_number(9, true).await?.expect("block below head");
        assert_eq!(block.transactions[0].hash, hash);
        assert!(client.block_by_number(9, false).await?.unwrap().transactions.is_empty());
        assert!(client.block_by_number(11, true).await?.is_none());
        assert!(client.transaction_receipt(hash).await?.unwrap().success);
        Ok(())
    }
}
