use crate::{PriceOracleError, TokenPriceOracle};

/// A [`TokenPriceOracle`] which is always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPriceOracle;

#[async_trait::async_trait]
impl TokenPriceOracle for FailingPriceOracle {
    async fn price_usd(&self, _symbol: &str) -> Result<f64, PriceOracleError> {
        Err(PriceOracleError::Unavailable("connection refused".to_string()))
    }
}
