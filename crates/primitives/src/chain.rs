//! Chain views consumed by the tracker.
//!
//! These are reduced projections of the JSON-RPC block, transaction and receipt responses,
//! holding only the fields the finality engine reads.

use alloy_primitives::{Address, Bytes, TxHash, B256};
use serde::{Deserialize, Serialize};

/// A block fetched from a chain.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBlock {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
    /// The block timestamp, in seconds.
    pub timestamp: u64,
    /// The transactions of the block. Empty if the block was fetched without transactions.
    pub transactions: Vec<ChainTransaction>,
}

/// A transaction included in a [`ChainBlock`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    /// The transaction hash.
    pub hash: TxHash,
    /// The sender of the transaction.
    pub from: Address,
    /// The recipient of the transaction, `None` for contract creations.
    pub to: Option<Address>,
    /// The transaction input.
    pub input: Bytes,
    /// The gas price of the transaction, if known at inclusion.
    pub gas_price: Option<u128>,
}

/// The receipt of a transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReceipt {
    /// The hash of the transaction.
    pub transaction_hash: TxHash,
    /// The block the transaction was included in.
    pub block_number: u64,
    /// Whether the transaction executed successfully.
    pub success: bool,
    /// The gas used by the transaction.
    pub gas_used: u64,
    /// The effective gas price paid, in wei.
    pub effective_gas_price: u128,
    /// The logs emitted by the transaction.
    pub logs: Vec<ReceiptLog>,
}

impl ChainReceipt {
    /// Returns an iterator over the first topic of every log in the receipt.
    pub fn event_signatures(&self) -> impl Iterator<Item = &B256> {
        self.logs.iter().filter_map(ReceiptLog::topic0)
    }
}

/// A log emitted by a transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLog {
    /// The emitting contract.
    pub address: Address,
    /// The log topics.
    pub topics: Vec<B256>,
}

impl ReceiptLog {
    /// Returns the event signature of the log, if any.
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}
