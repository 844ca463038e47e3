use crate::{
    CoordinatorConfig, CoordinatorMetrics, Correlator, Inner, SessionCoordinator, SessionTable,
    TimeWindowCorrelator,
};

use parking_lot::Mutex;
use settlement_db::Storage;
use settlement_finality::{Clock, CostAmortizer, FinalityCalculator, SystemClock};
use settlement_primitives::RollupRegistry;
use settlement_providers::{ChainClientPool, ChainConnector, StaticPriceOracle, TokenPriceOracle};
use settlement_watcher::BatchMonitorService;
use std::sync::{atomic::AtomicU64, Arc};
use tokio_util::sync::CancellationToken;

/// Builds a [`SessionCoordinator`].
#[derive(Debug)]
pub struct SessionCoordinatorBuilder {
    registry: Arc<RollupRegistry>,
    connector: Arc<dyn ChainConnector>,
    storage: Arc<dyn Storage>,
    config: CoordinatorConfig,
    oracle: Arc<dyn TokenPriceOracle>,
    clock: Arc<dyn Clock>,
    correlator: Option<Arc<dyn Correlator>>,
}

impl SessionCoordinatorBuilder {
    pub(crate) fn new(
        registry: Arc<RollupRegistry>,
        connector: Arc<dyn ChainConnector>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            registry,
            connector,
            storage,
            config: CoordinatorConfig::default(),
            oracle: Arc::new(StaticPriceOracle::default()),
            clock: Arc::new(SystemClock),
            correlator: None,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the oracle pricing the L1 native tokens. Without it every cost is valued at the
    /// fallback price.
    pub fn with_price_oracle(mut self, oracle: impl TokenPriceOracle + 'static) -> Self {
        self.oracle = Arc::new(oracle);
        self
    }

    /// Sets the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the default [`TimeWindowCorrelator`].
    pub fn with_correlator(mut self, correlator: impl Correlator + 'static) -> Self {
        self.correlator = Some(Arc::new(correlator));
        self
    }

    /// Returns the [`SessionCoordinator`].
    pub fn build(self) -> SessionCoordinator {
        let Self { registry, connector, storage, config, oracle, clock, correlator } = self;

        let pool = Arc::new(ChainClientPool::new(connector.clone()));
        let monitors = BatchMonitorService::new(pool.clone(), config.monitor);
        let calculator =
            FinalityCalculator::new(registry.clone(), clock.clone(), config.monitor.rpc_timeout);
        let amortizer = CostAmortizer::new(oracle, config.fallback_price_usd);
        let correlator = correlator
            .unwrap_or_else(|| Arc::new(TimeWindowCorrelator::new(config.correlation_window)));

        SessionCoordinator {
            inner: Arc::new(Inner {
                config,
                registry,
                storage,
                connector,
                pool,
                monitors,
                calculator,
                amortizer,
                clock,
                correlator,
                sessions: Mutex::new(SessionTable::default()),
                next_session_id: AtomicU64::new(1),
                next_record_id: AtomicU64::new(1),
                shutdown: CancellationToken::new(),
                metrics: CoordinatorMetrics::default(),
            }),
        }
    }
}
