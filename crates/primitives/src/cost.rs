use serde::{Deserialize, Serialize};

/// Where the token price used to value a cost came from.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    /// The price was served by the price oracle.
    #[default]
    Oracle,
    /// The oracle was unavailable and the configured fallback price was used.
    Fallback,
}

/// The L1 settlement cost of a batch amortized across its L2 transactions.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizedCost {
    /// The total cost of the batch transaction, in ETH.
    pub batch_cost_eth: f64,
    /// The total cost of the batch transaction, in USD.
    #[serde(rename = "batchCostUSD")]
    pub batch_cost_usd: f64,
    /// The cost attributed to a single L2 transaction, in ETH.
    pub per_tx_cost_eth: f64,
    /// The cost attributed to a single L2 transaction, in USD.
    #[serde(rename = "perTxCostUSD")]
    pub per_tx_cost_usd: f64,
    /// The token price used for the conversion.
    #[serde(rename = "tokenPriceUSD")]
    pub token_price_usd: f64,
    /// The origin of the token price.
    pub price_source: PriceSource,
}

impl AmortizedCost {
    /// Returns true if the cost was valued with the fallback price.
    pub const fn is_estimated_price(&self) -> bool {
        matches!(self.price_source, PriceSource::Fallback)
    }
}
