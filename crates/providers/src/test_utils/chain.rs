use crate::{ChainClient, ChainClientError, ChainConnector};

use alloy_primitives::{Address, Bytes, TxHash, B256};
use alloy_transport::TransportErrorKind;
use parking_lot::Mutex;
use settlement_primitives::{ChainBlock, ChainReceipt, ChainTransaction, NetworkId, ReceiptLog};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

/// The L1 block time used to derive the timestamps of unset blocks.
const BLOCK_TIME: u64 = 12;

/// An in-memory [`ChainClient`]. Clones share their state, so a test can keep a handle on a
/// client handed to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockChainClient {
    state: Arc<Mutex<MockChainState>>,
}

#[derive(Debug, Default)]
struct MockChainState {
    head: u64,
    blocks: HashMap<u64, ChainBlock>,
    receipts: HashMap<TxHash, ChainReceipt>,
    failing_requests: usize,
    unreachable: bool,
    latency: Option<Duration>,
    requests: usize,
}

impl MockChainClient {
    /// Returns a new [`MockChainClient`] with the provided head and empty blocks.
    pub fn new(head: u64) -> Self {
        let client = Self::default();
        client.set_head(head);
        client
    }

    /// Sets the head of the chain.
    pub fn set_head(&self, head: u64) {
        self.state.lock().head = head;
    }

    /// Returns the head of the chain.
    pub fn head(&self) -> u64 {
        self.state.lock().head
    }

    /// Inserts a block, replacing the empty block at its height.
    pub fn insert_block(&self, block: ChainBlock) {
        self.state.lock().blocks.insert(block.number, block);
    }

    /// Inserts a receipt.
    pub fn insert_receipt(&self, receipt: ChainReceipt) {
        self.state.lock().receipts.insert(receipt.transaction_hash, receipt);
    }

    /// Adds a transaction from `from` to the block at `block_number`, with a receipt of the
    /// provided outcome and log signatures. Returns the transaction hash.
    pub fn insert_transaction(
        &self,
        block_number: u64,
        from: Address,
        success: bool,
        topics: &[B256],
    ) -> TxHash {
        let input = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        self.insert_transaction_with_input(block_number, from, success, topics, input)
    }

    /// Adds a transaction carrying `input` as calldata, see [`Self::insert_transaction`]. Blob
    /// carrying transactions have empty calldata.
    pub fn insert_transaction_with_input(
        &self,
        block_number: u64,
        from: Address,
        success: bool,
        topics: &[B256],
        input: Bytes,
    ) -> TxHash {
        let mut state = self.state.lock();
        let block = state.blocks.entry(block_number).or_insert_with(|| empty_block(block_number));
        let hash = transaction_hash(block_number, block.transactions.len());
        block.transactions.push(ChainTransaction {
            hash,
            from,
            to: Some(Address::repeat_byte(0xaa)),
            input,
            gas_price: Some(20_000_000_000),
        });
        state.receipts.insert(
            hash,
            ChainReceipt {
                transaction_hash: hash,
                block_number,
                success,
                gas_used: 150_000,
                effective_gas_price: 20_000_000_000,
                logs: topics
                    .iter()
                    .map(|topic| ReceiptLog {
                        address: Address::repeat_byte(0xaa),
                        topics: vec![*topic],
                    })
                    .collect(),
            },
        );
        hash
    }

    /// Removes the receipt of the transaction.
    pub fn remove_receipt(&self, hash: &TxHash) {
        self.state.lock().receipts.remove(hash);
    }

    /// Fails the next `count` requests with an RPC error.
    pub fn fail_next_requests(&self, count: usize) {
        self.state.lock().failing_requests = count;
    }

    /// Fails every request while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Delays every request by the provided duration.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    /// Returns the number of requests served or failed so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests
    }

    async fn request(&self) -> Result<(), ChainClientError> {
        let latency = {
            let mut state = self.state.lock();
            state.requests += 1;
            if state.unreachable {
                return Err(TransportErrorKind::custom_str("connection refused").into())
            }
            if state.failing_requests > 0 {
                state.failing_requests -= 1;
                return Err(TransportErrorKind::custom_str("rate limited").into())
            }
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChainClient {
    async fn block_number(&self) -> Result<u64, ChainClientError> {
        self.request().await?;
        Ok(self.head())
    }

    async fn block_by_number(
        &self,
        number: u64,
        include_txs: bool,
    ) -> Result<Option<ChainBlock>, ChainClientError> {
        self.request().await?;
        let state = self.state.lock();
        if number > state.head {
            return Ok(None)
        }
        let mut block = state.blocks.get(&number).cloned().unwrap_or_else(|| empty_block(number));
        if !include_txs {
            block.transactions.clear();
        }
        Ok(Some(block))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<ChainReceipt>, ChainClientError> {
        self.request().await?;
        Ok(self.state.lock().receipts.get(&hash).cloned())
    }
}

fn empty_block(number: u64) -> ChainBlock {
    ChainBlock {
        number,
        hash: B256::left_padding_from(&number.to_be_bytes()),
        timestamp: number * BLOCK_TIME,
        transactions: Vec::new(),
    }
}

fn transaction_hash(block_number: u64, index: usize) -> TxHash {
    let mut hash = B256::left_padding_from(&block_number.to_be_bytes());
    hash[0] = 0xf0;
    hash[1] = index as u8;
    hash
}

/// A [`ChainConnector`] handing out [`MockChainClient`]s.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockConnectorState>>,
}

#[derive(Debug, Default)]
struct MockConnectorState {
    clients: HashMap<NetworkId, MockChainClient>,
    unreachable: HashSet<NetworkId>,
    connections: usize,
}

impl MockConnector {
    /// Registers the client of a network.
    pub fn with_client(self, network: impl Into<NetworkId>, client: MockChainClient) -> Self {
        self.state.lock().clients.insert(network.into(), client);
        self
    }

    /// Marks a network as unreachable.
    pub fn with_unreachable(self, network: impl Into<NetworkId>) -> Self {
        self.state.lock().unreachable.insert(network.into());
        self
    }

    /// Returns the client of a network.
    pub fn client(&self, network: &NetworkId) -> Option<MockChainClient> {
        self.state.lock().clients.get(network).cloned()
    }

    /// Returns the number of successful connections.
    pub fn connections(&self) -> usize {
        self.state.lock().connections
    }
}

#[async_trait::async_trait]
impl ChainConnector for MockConnector {
    async fn connect(&self, network: &NetworkId) -> Result<Arc<dyn ChainClient>, ChainClientError> {
        let mut state = self.state.lock();
        if state.unreachable.contains(network) {
            return Err(ChainClientError::Connection {
                network: network.clone(),
                reason: "connection refused".to_string(),
            })
        }
        let client = state.clients.get(network).cloned().ok_or_else(|| {
            ChainClientError::Connection {
                network: network.clone(),
                reason: "no endpoint configured".to_string(),
            }
        })?;
        state.connections += 1;
        Ok(Arc::new(client))
    }
}
