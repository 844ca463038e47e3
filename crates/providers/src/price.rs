use std::{collections::HashMap, fmt::Debug};

/// An error occurring while querying a token price.
#[derive(Debug, thiserror::Error)]
pub enum PriceOracleError {
    /// The oracle has no price for the symbol.
    #[error("no price for {0}")]
    UnknownSymbol(String),
    /// The oracle returned a negative or non-finite price.
    #[error("invalid price {price} for {symbol}")]
    InvalidPrice {
        /// The token symbol.
        symbol: String,
        /// The returned price.
        price: f64,
    },
    /// The oracle could not be reached.
    #[error("price oracle unavailable: {0}")]
    Unavailable(String),
}

/// Quotes token prices in USD.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait TokenPriceOracle: Send + Sync + Debug {
    /// Returns the USD price of one unit of the token.
    async fn price_usd(&self, symbol: &str) -> Result<f64, PriceOracleError>;
}

/// A [`TokenPriceOracle`] quoting from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    prices: HashMap<String, f64>,
}

impl StaticPriceOracle {
    /// Returns a new [`StaticPriceOracle`] from `(symbol, price)` pairs.
    pub fn new<S: AsRef<str>>(prices: impl IntoIterator<Item = (S, f64)>) -> Self {
        prices
            .into_iter()
            .fold(Self::default(), |oracle, (symbol, price)| oracle.with_price(symbol, price))
    }

    /// Sets the price of a symbol. Symbols are case-insensitive.
    pub fn with_price(mut self, symbol: impl AsRef<str>, price: f64) -> Self {
        self.prices.insert(symbol.as_ref().to_ascii_uppercase(), price);
        self
    }
}

#[async_trait::async_trait]
impl TokenPriceOracle for StaticPriceOracle {
    async fn price_usd(&self, symbol: &str) -> Result<f64, PriceOracleError> {
        let price = *self
            .prices
            .get(&symbol.to_ascii_uppercase())
            .ok_or_else(|| PriceOracleError::UnknownSymbol(symbol.to_string()))?;
        if !price.is_finite() || price < 0.0 {
            return Err(PriceOracleError::InvalidPrice { symbol: symbol.to_string(), price })
        }
        Ok(price)
    }
}
