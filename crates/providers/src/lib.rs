//! The crate exposes the chain and price capabilities consumed by the settlement tracker, along
//! with their implementations.

pub use chain::{with_timeout, AlloyChainClient, ChainClient, ChainClientError};
mod chain;

pub use connector::{ChainConnector, HttpConnector, TransportRetryConfig};
mod connector;

pub use pool::ChainClientPool;
mod pool;

pub use price::{PriceOracleError, StaticPriceOracle, TokenPriceOracle};
mod price;

/// Test utilities for providers.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
