use crate::constants;

use alloy_primitives::{Address, TxHash};
use reqwest::Url;
use settlement_coordinator::CoordinatorConfig;
use settlement_primitives::SessionConfig;
use settlement_providers::{HttpConnector, StaticPriceOracle, TransportRetryConfig};
use settlement_watcher::{constants as monitor_constants, MonitorConfig};
use std::time::Duration;

/// The arguments of the settlement tracker.
#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "Tracks the L1 settlement of L2 transactions")]
pub struct TrackerArgs {
    /// The RPC arguments
    #[command(flatten)]
    pub rpc: RpcArgs,
    /// The session arguments
    #[command(flatten)]
    pub session: SessionArgs,
    /// The batch monitor arguments
    #[command(flatten)]
    pub monitor: MonitorArgs,
    /// The price arguments
    #[command(flatten)]
    pub price: PriceArgs,
}

impl TrackerArgs {
    /// Returns the connector to the L1 and L2 endpoints.
    pub fn connector(&self) -> HttpConnector {
        let RpcArgs { max_retries, initial_backoff, compute_units_per_second, .. } = self.rpc;
        let retry = TransportRetryConfig { max_retries, initial_backoff, compute_units_per_second };
        HttpConnector::new(retry)
            .with_endpoint(self.session.l1_network.as_str(), self.rpc.l1_url.clone())
            .with_endpoint(self.session.l2_network.as_str(), self.rpc.l2_url.clone())
    }

    /// Returns the configuration of the session coordinator.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let defaults = CoordinatorConfig::default();
        CoordinatorConfig {
            monitor: MonitorConfig {
                poll_interval: Duration::from_secs(self.monitor.poll_interval),
                scan_depth: self.monitor.scan_depth,
                ..defaults.monitor
            },
            fallback_price_usd: self.price.fallback_usd,
            ..defaults
        }
    }

    /// Returns the request starting the tracked session.
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::new(
            self.session.l1_network.as_str(),
            self.session.l2_network.as_str(),
            self.session.duration_hours,
        );
        if self.session.batch_posters.is_empty() {
            config
        } else {
            config.with_batch_posters(self.session.batch_posters.iter().copied())
        }
    }

    /// Returns the price oracle of the L1 native token.
    pub fn price_oracle(&self) -> StaticPriceOracle {
        self.price
            .static_usd
            .map(|price| StaticPriceOracle::new([("ETH", price)]))
            .unwrap_or_default()
    }
}

/// The arguments of the RPC endpoints.
#[derive(Debug, Clone, clap::Args)]
pub struct RpcArgs {
    /// The URL of the L1 RPC.
    #[arg(long = "l1.url", id = "l1_url", value_name = "L1_URL", env = "L1_URL")]
    pub l1_url: Url,
    /// The URL of the L2 RPC.
    #[arg(long = "l2.url", id = "l2_url", value_name = "L2_URL", env = "L2_URL")]
    pub l2_url: Url,
    /// The max amount of retries of a rate limited request.
    #[arg(long = "rpc.max-retries", id = "rpc_max_retries", value_name = "RPC_MAX_RETRIES", default_value_t = constants::PROVIDER_MAX_RETRIES)]
    pub max_retries: u32,
    /// The initial backoff of a rate limited request, in milliseconds.
    #[arg(long = "rpc.initial-backoff", id = "rpc_initial_backoff", value_name = "RPC_INITIAL_BACKOFF", default_value_t = constants::PROVIDER_INITIAL_BACKOFF)]
    pub initial_backoff: u64,
    /// The compute units per second of the endpoints.
    #[arg(long = "rpc.cups", id = "rpc_compute_units_per_second", value_name = "RPC_COMPUTE_UNITS_PER_SECOND", default_value_t = constants::PROVIDER_COMPUTE_UNITS_PER_SECOND)]
    pub compute_units_per_second: u64,
}

/// The arguments of the tracked session.
#[derive(Debug, Clone, clap::Args)]
pub struct SessionArgs {
    /// The L1 network the batches are posted to.
    #[arg(long = "session.l1-network", id = "session_l1_network", value_name = "L1_NETWORK", default_value = constants::DEFAULT_L1_NETWORK)]
    pub l1_network: String,
    /// The L2 network whose transactions are tracked.
    #[arg(long = "session.l2-network", id = "session_l2_network", value_name = "L2_NETWORK", default_value = constants::DEFAULT_L2_NETWORK)]
    pub l2_network: String,
    /// How long the session monitors L1, in hours.
    #[arg(long = "session.duration-hours", id = "session_duration_hours", value_name = "HOURS", default_value_t = constants::DEFAULT_SESSION_DURATION_HOURS)]
    pub duration_hours: f64,
    /// Batch posters replacing the ones of the rollup. Can be repeated.
    #[arg(long = "session.batch-poster", id = "session_batch_poster", value_name = "ADDRESS")]
    pub batch_posters: Vec<Address>,
    /// L2 transactions to track. Can be repeated.
    #[arg(long = "session.track-tx", id = "session_track_tx", value_name = "TX_HASH")]
    pub tracked_transactions: Vec<TxHash>,
}

/// The arguments of the batch monitor.
#[derive(Debug, Clone, clap::Args)]
pub struct MonitorArgs {
    /// The interval between two polls of the L1, in seconds.
    #[arg(long = "monitor.poll-interval", id = "monitor_poll_interval", value_name = "SECONDS", default_value_t = monitor_constants::DEFAULT_POLL_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,
    /// The number of trailing L1 blocks scanned per poll, between 5 and 10.
    #[arg(long = "monitor.scan-depth", id = "monitor_scan_depth", value_name = "BLOCKS", default_value_t = monitor_constants::DEFAULT_SCAN_DEPTH)]
    pub scan_depth: u64,
}

/// The arguments of the token prices.
#[derive(Debug, Clone, clap::Args)]
pub struct PriceArgs {
    /// The USD price of ETH used when no price is available.
    #[arg(long = "price.fallback-usd", id = "price_fallback_usd", value_name = "USD", default_value_t = settlement_coordinator::constants::DEFAULT_FALLBACK_PRICE_USD)]
    pub fallback_usd: f64,
    /// A fixed USD price of ETH.
    #[arg(long = "price.static-usd", id = "price_static_usd", value_name = "USD")]
    pub static_usd: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use settlement_primitives::NetworkId;

    #[test]
    fn test_parse_defaults() -> eyre::Result<()> {
        let args = TrackerArgs::try_parse_from([
            "settlement-tracker",
            "--l1.url",
            "http://localhost:8545",
            "--l2.url",
            "http://localhost:8547",
        ])?;

        let session = args.session_config();
        assert_eq!(session.l1_network_id, NetworkId::from("sepolia"));
        assert_eq!(session.l2_network_id, NetworkId::from("base-sepolia"));
        assert!(session.batch_poster_addresses.is_none());

        let config = args.coordinator_config();
        assert_eq!(config.monitor.poll_interval, Duration::from_secs(15));
        assert_eq!(config.monitor.scan_depth, 8);
        assert_eq!(config.fallback_price_usd, 3_000.0);
        assert!(args.connector().endpoint(&"base-sepolia".into()).is_some());
        Ok(())
    }

    #[test]
    fn test_parse_session_overrides() -> eyre::Result<()> {
        let poster = Address::repeat_byte(0x11);
        let poster_arg = poster.to_string();
        let args = TrackerArgs::try_parse_from([
            "settlement-tracker",
            "--l1.url",
            "http://localhost:8545",
            "--l2.url",
            "http://localhost:8547",
            "--session.l2-network",
            "arbitrum-sepolia",
            "--session.duration-hours",
            "0.5",
            "--session.batch-poster",
            poster_arg.as_str(),
            "--monitor.scan-depth",
            "10",
            "--price.static-usd",
            "2500",
        ])?;

        let session = args.session_config();
        assert_eq!(session.l2_network_id, NetworkId::from("arbitrum-sepolia"));
        assert_eq!(session.monitoring_duration_hours, 0.5);
        assert!(session.batch_poster_addresses.is_some_and(|posters| posters.contains(&poster)));
        assert_eq!(args.coordinator_config().monitor.scan_depth, 10);
        assert_eq!(args.price.static_usd, Some(2_500.0));
        Ok(())
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let result = TrackerArgs::try_parse_from([
            "settlement-tracker",
            "--l1.url",
            "http://localhost:8545",
            "--l2.url",
            "http://localhost:8547",
            "--monitor.poll-interval",
            "0",
        ]);
        assert!(result.is_err());
    }
}
