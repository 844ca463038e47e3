use settlement_primitives::{AmortizedCost, PriceSource};
use settlement_providers::TokenPriceOracle;

/// The number of wei in one ether.
const WEI_PER_ETH: f64 = 1e18;

/// Spreads the L1 cost of a batch across the L2 transactions it settles.
#[derive(Debug, Clone)]
pub struct CostAmortizer<O> {
    oracle: O,
    fallback_price_usd: f64,
}

impl<O: TokenPriceOracle> CostAmortizer<O> {
    /// Returns a new [`CostAmortizer`] valuing costs with the oracle, or with
    /// `fallback_price_usd` while the oracle is unavailable.
    pub const fn new(oracle: O, fallback_price_usd: f64) -> Self {
        Self { oracle, fallback_price_usd }
    }

    /// Returns the cost of a batch which used `gas_used` gas at `gas_price` wei, amortized over
    /// `estimated_batch_size` transactions and valued in the USD price of `symbol`.
    ///
    /// Never fails: a failing oracle is substituted by the fallback price and the cost is marked
    /// as estimated.
    pub async fn amortize(
        &self,
        gas_used: u64,
        gas_price: u128,
        estimated_batch_size: u64,
        symbol: &str,
    ) -> AmortizedCost {
        let (price, source) = match self.oracle.price_usd(symbol).await {
            Ok(price) => (price, PriceSource::Oracle),
            Err(err) => {
                tracing::warn!(target: "settlement::finality", %symbol, %err, fallback = self.fallback_price_usd, "price oracle unavailable, using fallback price");
                (self.fallback_price_usd, PriceSource::Fallback)
            }
        };
        amortize_with_price(gas_used, gas_price, estimated_batch_size, price, source)
    }
}

/// Returns the cost of a batch valued at `token_price_usd`.
pub fn amortize_with_price(
    gas_used: u64,
    gas_price: u128,
    estimated_batch_size: u64,
    token_price_usd: f64,
    price_source: PriceSource,
) -> AmortizedCost {
    let batch_cost_wei = u128::from(gas_used).saturating_mul(gas_price);
    let batch_cost_eth = batch_cost_wei as f64 / WEI_PER_ETH;
    let per_tx_cost_eth = batch_cost_eth / estimated_batch_size.max(1) as f64;

    AmortizedCost {
        batch_cost_eth,
        batch_cost_usd: batch_cost_eth * token_price_usd,
        per_tx_cost_eth,
        per_tx_cost_usd: per_tx_cost_eth * token_price_usd,
        token_price_usd,
        price_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_providers::{test_utils::FailingPriceOracle, StaticPriceOracle};

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_amortize_with_price() {
        // 200k gas at 50 gwei is 0.01 ETH.
        let cost = amortize_with_price(200_000, 50_000_000_000, 500, 3_000.0, PriceSource::Oracle);
        assert_close(cost.batch_cost_eth, 0.01);
        assert_close(cost.batch_cost_usd, 30.0);
        assert_close(cost.per_tx_cost_eth, 0.00002);
        assert_close(cost.per_tx_cost_usd, 0.06);
    }

    #[test]
    fn test_empty_batch_is_not_divided_by_zero() {
        let cost = amortize_with_price(100_000, 1_000_000_000, 0, 2_000.0, PriceSource::Oracle);
        assert_close(cost.per_tx_cost_eth, cost.batch_cost_eth);
        assert!(cost.per_tx_cost_usd.is_finite());
    }

    #[tokio::test]
    async fn test_oracle_price_is_used() {
        let amortizer = CostAmortizer::new(StaticPriceOracle::new([("ETH", 2_000.0)]), 3_000.0);
        let cost = amortizer.amortize(200_000, 50_000_000_000, 1, "ETH").await;

        assert_eq!(cost.price_source, PriceSource::Oracle);
        assert_close(cost.batch_cost_usd, 20.0);
    }

    #[tokio::test]
    async fn test_failing_oracle_falls_back() {
        let amortizer = CostAmortizer::new(FailingPriceOracle, 3_000.0);
        let cost = amortizer.amortize(200_000, 50_000_000_000, 1, "ETH").await;

        assert!(cost.is_estimated_price());
        assert_close(cost.token_price_usd, 3_000.0);
        assert_close(cost.batch_cost_usd, 30.0);
    }
}
