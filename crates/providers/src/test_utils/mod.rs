//! Test utils for providers.

mod arbitrary;

pub use chain::{MockChainClient, MockConnector};
mod chain;

pub use price::FailingPriceOracle;
mod price;

/// Installs a tracing subscriber writing to the test output, honoring `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
