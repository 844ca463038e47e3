//! The session coordinator of the settlement tracker.
//!
//! A [`SessionCoordinator`] owns the tracking sessions: it starts one batch monitor per
//! session, attributes the detected batches to the pending L2 transactions of the session, and
//! pushes the results to the subscribers of the session.

mod builder;
pub use builder::SessionCoordinatorBuilder;

mod config;
pub use config::CoordinatorConfig;

pub mod constants;

mod correlation;
pub use correlation::{settlement_time_ms, Correlator, TimeWindowCorrelator};

mod error;
pub use error::CoordinatorError;

mod event;
pub use event::{BatchDetectedEvent, SessionEndedEvent, SessionEvent};

mod metrics;
pub use metrics::CoordinatorMetrics;

mod retry;
pub use retry::Retry;

mod statistics;
pub use statistics::SessionStatistics;

mod stream;
pub use stream::SessionEventStream;

use alloy_primitives::TxHash;
use parking_lot::Mutex;
use settlement_db::Storage;
use settlement_finality::{Clock, CostAmortizer, FinalityCalculator};
use settlement_primitives::{
    DetectedBatch, FinalityMetrics, L1SettlementInfo, L2BlockMeta, NetworkId, PendingRecord,
    RecordId, RollupProfile, RollupRegistry, SessionConfig, SessionId, SessionStatus,
    TrackingSession,
};
use settlement_providers::{
    with_timeout, ChainClient, ChainClientError, ChainClientPool, ChainConnector, TokenPriceOracle,
};
use settlement_watcher::{BatchHandler, BatchMonitorService};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};
use tokio::{sync::broadcast, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Coordinates the tracking sessions.
///
/// Cheap to clone: clones share the sessions.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: CoordinatorConfig,
    registry: Arc<RollupRegistry>,
    storage: Arc<dyn Storage>,
    connector: Arc<dyn ChainConnector>,
    pool: Arc<ChainClientPool<Arc<dyn ChainConnector>>>,
    monitors: BatchMonitorService<Arc<dyn ChainConnector>>,
    calculator: FinalityCalculator,
    amortizer: CostAmortizer<Arc<dyn TokenPriceOracle>>,
    clock: Arc<dyn Clock>,
    correlator: Arc<dyn Correlator>,
    /// The runtime state of the sessions. Never held across an await point.
    sessions: Mutex<SessionTable>,
    next_session_id: AtomicU64,
    next_record_id: AtomicU64,
    shutdown: CancellationToken,
    metrics: CoordinatorMetrics,
}

#[derive(Debug, Default)]
struct SessionTable {
    sessions: HashMap<SessionId, SessionEntry>,
}

#[derive(Debug)]
struct SessionEntry {
    session: TrackingSession,
    /// The rollup profile with the batch posters of the session.
    profile: Arc<RollupProfile>,
    /// Dropped when the session terminates, which closes the streams of the session.
    events: Option<broadcast::Sender<SessionEvent>>,
    /// Cancels the task completing the session after its monitoring duration.
    expiry: Option<CancellationToken>,
    /// The L1 client, held while the session is monitoring.
    l1: Option<Arc<dyn ChainClient>>,
}

impl SessionCoordinator {
    /// Returns a builder of a coordinator tracking the rollups of the registry, reaching the
    /// chains through the connector and persisting into the storage.
    pub fn builder(
        registry: Arc<RollupRegistry>,
        connector: Arc<dyn ChainConnector>,
        storage: Arc<dyn Storage>,
    ) -> SessionCoordinatorBuilder {
        SessionCoordinatorBuilder::new(registry, connector, storage)
    }

    /// Starts a session monitoring the L1 for the batches of the L2.
    ///
    /// A session whose chains cannot be reached is persisted as [`SessionStatus::Failed`] and
    /// the connection error is returned. The engine never retries a failed session.
    pub async fn start_session(
        &self,
        config: SessionConfig,
    ) -> Result<SessionId, CoordinatorError> {
        self.start(config, false).await.map(|(session_id, _)| session_id)
    }

    /// Starts a session and subscribes to its events before its monitor runs.
    pub async fn start_and_subscribe(
        &self,
        config: SessionConfig,
    ) -> Result<(SessionId, SessionEventStream), CoordinatorError> {
        let (session_id, stream) = self.start(config, true).await?;
        Ok((session_id, stream.unwrap_or_else(|| SessionEventStream::closed(session_id))))
    }

    async fn start(
        &self,
        config: SessionConfig,
        subscribe: bool,
    ) -> Result<(SessionId, Option<SessionEventStream>), CoordinatorError> {
        let inner = &self.inner;
        let profile = inner
            .registry
            .get(&config.l2_network_id)
            .ok_or_else(|| CoordinatorError::UnsupportedNetwork(config.l2_network_id.clone()))?;
        if profile.l1_network_id != config.l1_network_id {
            tracing::warn!(target: "settlement::coordinator", l2 = %config.l2_network_id, l1 = %config.l1_network_id, settles_to = %profile.l1_network_id, "rollup does not settle to the requested L1");
            return Err(CoordinatorError::UnsupportedNetwork(config.l1_network_id.clone()))
        }
        let profile = match &config.batch_poster_addresses {
            Some(posters) => Arc::new(profile.with_batch_posters(posters.iter().copied())),
            None => profile,
        };
        if profile.batch_poster_addresses.is_empty() {
            tracing::warn!(target: "settlement::coordinator", l2 = %profile.network_id, "no batch poster known for the rollup, a poster override is required");
            return Err(CoordinatorError::MissingBatchPosters(profile.network_id.clone()))
        }

        let session_id = SessionId(inner.next_session_id.fetch_add(1, Ordering::Relaxed));
        let now = inner.clock.now_secs();
        let mut session = TrackingSession::new(session_id, config, now);

        let clients = async {
            let l1 = self.connect_checked(session_id, &session.l1_network_id).await?;
            self.connect_checked(session_id, &session.l2_network_id).await?;
            Ok::<_, ChainClientError>(l1)
        };
        let l1 = match clients.await {
            Ok(l1) => l1,
            Err(err) => {
                inner.pool.release(session_id);
                // a new session is always monitoring.
                let _ = session.try_transition(SessionStatus::Failed, now);
                if let Err(err) = inner.storage.save_session(&session).await {
                    tracing::error!(target: "settlement::coordinator", session = %session_id, %err, "failed to persist failed session");
                }
                inner.sessions.lock().sessions.insert(
                    session_id,
                    SessionEntry { session, profile, events: None, expiry: None, l1: None },
                );
                inner.metrics.sessions_failed.increment(1);
                tracing::warn!(target: "settlement::coordinator", session = %session_id, %err, "session failed to connect");
                return Err(CoordinatorError::Connection(err))
            }
        };

        if let Err(err) = inner.storage.save_session(&session).await {
            inner.pool.release(session_id);
            return Err(err.into())
        }

        let (events, _) = broadcast::channel(inner.config.event_buffer.max(1));
        let stream = subscribe.then(|| {
            SessionEventStream::new(
                session_id,
                events.subscribe(),
                inner.metrics.events_dropped.clone(),
            )
        });
        let duration = session.monitoring_duration();
        let l1_network = session.l1_network_id.clone();
        inner.sessions.lock().sessions.insert(
            session_id,
            SessionEntry {
                session,
                profile: profile.clone(),
                events: Some(events),
                expiry: None,
                l1: Some(l1),
            },
        );

        let l2_network = profile.network_id.clone();
        let handler = SessionBatchHandler { session_id, coordinator: Arc::downgrade(inner) };
        if let Err(err) = inner.monitors.start(session_id, profile, &l1_network, handler).await {
            tracing::error!(target: "settlement::coordinator", session = %session_id, %err, "failed to start batch monitor");
            self.finish_session(session_id, SessionStatus::Failed).await?;
            return Err(err.into())
        }

        let expiry = inner.shutdown.child_token();
        if let Some(entry) = inner.sessions.lock().sessions.get_mut(&session_id) {
            entry.expiry = Some(expiry.clone());
        }
        let coordinator = Arc::downgrade(inner);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = expiry.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    let Some(inner) = coordinator.upgrade() else { return };
                    tracing::debug!(target: "settlement::coordinator", session = %session_id, "monitoring duration elapsed");
                    let coordinator = Self { inner };
                    if let Err(err) =
                        coordinator.finish_session(session_id, SessionStatus::Completed).await
                    {
                        tracing::error!(target: "settlement::coordinator", session = %session_id, %err, "failed to complete session");
                    }
                }
            }
        });

        inner.metrics.sessions_started.increment(1);
        tracing::info!(target: "settlement::coordinator", session = %session_id, l1 = %l1_network, l2 = %l2_network, ?duration, "started session");
        Ok((session_id, stream))
    }

    /// Opens the client of the network for the session and checks it answers.
    async fn connect_checked(
        &self,
        session_id: SessionId,
        network: &NetworkId,
    ) -> Result<Arc<dyn ChainClient>, ChainClientError> {
        let pool = &self.inner.pool;
        let timeout = self.inner.config.monitor.rpc_timeout;
        self.inner
            .config
            .connect_retry
            .retry("connect", move || async move {
                let client = pool.acquire(session_id, network).await?;
                let head = with_timeout(timeout, client.block_number()).await?;
                tracing::debug!(target: "settlement::coordinator", session = %session_id, %network, head, "chain client connected");
                Ok::<_, ChainClientError>(client)
            })
            .await
    }

    /// Stops a monitoring session, moving it to [`SessionStatus::Completed`]. Returns false if
    /// the session had already terminated.
    pub async fn stop_session(&self, session_id: SessionId) -> Result<bool, CoordinatorError> {
        self.finish_session(session_id, SessionStatus::Completed).await
    }

    /// Moves a monitoring session to the terminal `status`: stops its monitor, releases its
    /// clients, and closes its event streams after a final [`SessionEvent::SessionEnded`].
    ///
    /// Returns false if the session had already terminated.
    async fn finish_session(
        &self,
        session_id: SessionId,
        status: SessionStatus,
    ) -> Result<bool, CoordinatorError> {
        let inner = &self.inner;
        let now = inner.clock.now_secs();
        let (session, events, expiry) = {
            let mut sessions = inner.sessions.lock();
            let entry = sessions
                .sessions
                .get_mut(&session_id)
                .ok_or(CoordinatorError::SessionNotFound(session_id))?;
            if let Err(err) = entry.session.try_transition(status, now) {
                tracing::debug!(target: "settlement::coordinator", %err, "session already terminated");
                return Ok(false)
            }
            entry.l1 = None;
            (entry.session.clone(), entry.events.take(), entry.expiry.take())
        };

        if let Some(expiry) = expiry {
            expiry.cancel();
        }
        inner.monitors.stop(session_id).await;
        inner.pool.release(session_id);

        if let Err(err) = inner
            .config
            .storage_retry
            .retry("update_session", || inner.storage.update_session(&session))
            .await
        {
            tracing::error!(target: "settlement::coordinator", session = %session_id, %err, "failed to persist session status");
        }

        if let Some(events) = events {
            let _ =
                events.send(SessionEvent::SessionEnded(SessionEndedEvent { session_id, status }));
        }

        match status {
            SessionStatus::Completed => inner.metrics.sessions_completed.increment(1),
            SessionStatus::Timeout => inner.metrics.sessions_timed_out.increment(1),
            SessionStatus::Failed => inner.metrics.sessions_failed.increment(1),
            SessionStatus::Monitoring => {}
        }
        tracing::info!(target: "settlement::coordinator", session = %session_id, %status, "session ended");
        Ok(true)
    }

    /// Registers an L2 transaction of a monitoring session, to be attributed to a later batch.
    pub async fn register_pending_transaction(
        &self,
        session_id: SessionId,
        l2_tx_hash: TxHash,
        meta: L2BlockMeta,
    ) -> Result<RecordId, CoordinatorError> {
        let inner = &self.inner;
        {
            let sessions = inner.sessions.lock();
            let entry = sessions
                .sessions
                .get(&session_id)
                .ok_or(CoordinatorError::SessionNotFound(session_id))?;
            if !entry.session.is_active() {
                return Err(CoordinatorError::SessionNotActive {
                    session_id,
                    status: entry.session.status,
                })
            }
        }

        let id = RecordId(inner.next_record_id.fetch_add(1, Ordering::Relaxed));
        inner.storage.save_record(&PendingRecord::new(id, session_id, l2_tx_hash, meta)).await?;
        inner.metrics.records_registered.increment(1);
        tracing::debug!(target: "settlement::coordinator", session = %session_id, record = %id, ?l2_tx_hash, l2_block = meta.block_number, "registered pending transaction");
        Ok(id)
    }

    /// Attributes a detected batch to the pending records of the session and notifies the
    /// subscribers. Returns the number of records attributed to the batch.
    ///
    /// This is the entrypoint of the batch monitor of the session and can be used to inject
    /// batches.
    #[tracing::instrument(
        target = "settlement::coordinator",
        skip_all,
        fields(session = %session_id, l1_tx_hash = ?batch.l1_tx_hash, l1_block = batch.l1_block_number)
    )]
    pub async fn handle_detected_batch(
        &self,
        session_id: SessionId,
        batch: DetectedBatch,
    ) -> Result<usize, CoordinatorError> {
        let inner = &self.inner;
        let (profile, l1) = {
            let sessions = inner.sessions.lock();
            let entry = sessions
                .sessions
                .get(&session_id)
                .ok_or(CoordinatorError::SessionNotFound(session_id))?;
            match (&entry.l1, entry.session.is_active()) {
                (Some(l1), true) => (entry.profile.clone(), l1.clone()),
                _ => {
                    return Err(CoordinatorError::SessionNotActive {
                        session_id,
                        status: entry.session.status,
                    })
                }
            }
        };

        let estimated_batch_size = profile.family.estimated_batch_size();
        let cost = inner
            .amortizer
            .amortize(
                batch.gas_used,
                batch.gas_price,
                estimated_batch_size,
                &profile.native_token_symbol,
            )
            .await;
        let finality = match inner
            .calculator
            .calculate(
                &*l1,
                &profile.network_id,
                batch.l1_tx_hash,
                batch.l1_block_number,
                batch.l1_timestamp,
            )
            .await
        {
            Ok(metrics) => Some(metrics),
            Err(err) => {
                tracing::warn!(target: "settlement::coordinator", %err, "failed to calculate batch finality, recomputed on read");
                None
            }
        };

        let candidates: Vec<_> = inner
            .storage
            .find_unsettled_by_session(session_id)
            .await?
            .into_iter()
            .filter(|record| inner.correlator.is_candidate(record, &batch))
            .collect();
        if candidates.len() > 1 {
            inner.metrics.ambiguous_correlations.increment(1);
            tracing::debug!(target: "settlement::coordinator", candidates = candidates.len(), "batch matches several pending records, attributing to all");
        }

        let mut correlated = 0usize;
        let mut total_settlement_time_ms = 0u64;
        for mut record in candidates {
            let settlement_time_ms = settlement_time_ms(&record, &batch);
            record.l1_settlement_info = Some(L1SettlementInfo {
                l1_tx_hash: batch.l1_tx_hash,
                l1_block_number: batch.l1_block_number,
                l1_timestamp: batch.l1_timestamp,
                settlement_time_ms,
                l2_block_range: batch.l2_block_range,
                estimated_batch_size,
                cost: cost.clone(),
            });
            record.finality_metrics = finality.clone();

            match inner
                .config
                .storage_retry
                .retry("update_record", || inner.storage.update_record(&record))
                .await
            {
                Ok(()) => {
                    correlated += 1;
                    total_settlement_time_ms =
                        total_settlement_time_ms.saturating_add(settlement_time_ms);
                }
                Err(err) => {
                    tracing::error!(target: "settlement::coordinator", record = %record.id, %err, "failed to attribute record to batch");
                }
            }
        }
        inner.metrics.records_correlated.increment(correlated as u64);

        let event = SessionEvent::BatchDetected(BatchDetectedEvent {
            session_id,
            l1_tx_hash: batch.l1_tx_hash,
            l2_block_start: batch.l2_block_range.start,
            l2_block_end: batch.l2_block_range.end,
            transaction_count: correlated,
            settlement_time_ms: total_settlement_time_ms
                .checked_div(correlated as u64)
                .unwrap_or_default(),
            l1_cost_usd: cost.batch_cost_usd,
            amortized_cost_per_tx_usd: cost.per_tx_cost_usd,
            finality_confidence: finality
                .as_ref()
                .map(|metrics| metrics.confidence)
                .unwrap_or_default(),
        });
        // the sender is gone once the session terminated, the event is dropped with it.
        let table = inner.sessions.lock();
        if let Some(events) = table.sessions.get(&session_id).and_then(|e| e.events.as_ref()) {
            let _ = events.send(event);
        }
        drop(table);

        tracing::debug!(target: "settlement::coordinator", correlated, l2_range = %batch.l2_block_range, "handled batch");
        Ok(correlated)
    }

    /// Returns the records of the session. The finality of settled records is recalculated from
    /// the current L1 state; records keep their stored finality when the L1 cannot be reached.
    pub async fn get_results(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<PendingRecord>, CoordinatorError> {
        let inner = &self.inner;
        let session = inner
            .storage
            .get_session(session_id)
            .await?
            .ok_or(CoordinatorError::SessionNotFound(session_id))?;
        let mut records = inner.storage.find_by_session(session_id).await?;
        if !records.iter().any(PendingRecord::is_settled) {
            return Ok(records)
        }

        let live =
            inner.sessions.lock().sessions.get(&session_id).and_then(|entry| entry.l1.clone());
        let l1 = match live {
            Some(l1) => l1,
            None => match inner.connector.connect(&session.l1_network_id).await {
                Ok(l1) => l1,
                Err(err) => {
                    tracing::warn!(target: "settlement::coordinator", session = %session_id, %err, "L1 unreachable, returning stored finality");
                    return Ok(records)
                }
            },
        };

        let mut finality: HashMap<TxHash, Option<FinalityMetrics>> = HashMap::new();
        for record in &mut records {
            let Some(info) = &record.l1_settlement_info else { continue };
            if !finality.contains_key(&info.l1_tx_hash) {
                let metrics = inner
                    .calculator
                    .calculate(
                        &*l1,
                        &session.l2_network_id,
                        info.l1_tx_hash,
                        info.l1_block_number,
                        info.l1_timestamp,
                    )
                    .await
                    .inspect_err(|err| {
                        tracing::warn!(target: "settlement::coordinator", session = %session_id, l1_tx_hash = ?info.l1_tx_hash, %err, "failed to recalculate finality");
                    })
                    .ok();
                finality.insert(info.l1_tx_hash, metrics);
            }
            if let Some(Some(metrics)) = finality.get(&info.l1_tx_hash) {
                record.finality_metrics = Some(metrics.clone());
            }
        }
        Ok(records)
    }

    /// Returns the settlement statistics of the session.
    pub async fn statistics(
        &self,
        session_id: SessionId,
    ) -> Result<SessionStatistics, CoordinatorError> {
        let records = self.get_results(session_id).await?;
        let status = self.get_session(session_id).await?.status;
        Ok(SessionStatistics::from_records(session_id, status, &records))
    }

    /// Returns the session.
    pub async fn get_session(
        &self,
        session_id: SessionId,
    ) -> Result<TrackingSession, CoordinatorError> {
        self.inner
            .storage
            .get_session(session_id)
            .await?
            .ok_or(CoordinatorError::SessionNotFound(session_id))
    }

    /// Returns every session, ordered by id.
    pub async fn list_sessions(&self) -> Result<Vec<TrackingSession>, CoordinatorError> {
        Ok(self.inner.storage.list_sessions().await?)
    }

    /// Subscribes to the events sent from now on by the session. The stream of a terminated
    /// session is already closed.
    pub fn subscribe(&self, session_id: SessionId) -> Result<SessionEventStream, CoordinatorError> {
        let sessions = self.inner.sessions.lock();
        let entry = sessions
            .sessions
            .get(&session_id)
            .ok_or(CoordinatorError::SessionNotFound(session_id))?;
        Ok(match &entry.events {
            Some(events) => SessionEventStream::new(
                session_id,
                events.subscribe(),
                self.inner.metrics.events_dropped.clone(),
            ),
            None => SessionEventStream::closed(session_id),
        })
    }

    /// Returns true if the session is monitoring.
    pub fn is_monitoring(&self, session_id: SessionId) -> bool {
        self.inner
            .sessions
            .lock()
            .sessions
            .get(&session_id)
            .is_some_and(|entry| entry.session.is_active())
    }

    /// Force-stops the monitoring sessions older than the maximum session age, whatever their
    /// monitoring duration, with [`SessionStatus::Timeout`]. Returns the stopped sessions.
    pub async fn sweep_expired(&self) -> Vec<SessionId> {
        let now = self.inner.clock.now_secs();
        let max_age = self.inner.config.max_session_age.as_secs();
        let expired: Vec<_> = self
            .inner
            .sessions
            .lock()
            .sessions
            .values()
            .filter(|entry| entry.session.is_active() && entry.session.age_secs(now) >= max_age)
            .map(|entry| entry.session.id)
            .collect();

        let mut stopped = Vec::with_capacity(expired.len());
        for session_id in expired {
            match self.finish_session(session_id, SessionStatus::Timeout).await {
                Ok(true) => stopped.push(session_id),
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(target: "settlement::coordinator", session = %session_id, %err, "failed to time out session");
                }
            }
        }
        if !stopped.is_empty() {
            tracing::info!(target: "settlement::coordinator", count = stopped.len(), "timed out expired sessions");
        }
        stopped
    }

    /// Spawns the task sweeping expired sessions every sweep interval, until shutdown.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let coordinator = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let period = self.inner.config.sweep_interval.max(constants::MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(inner) = coordinator.upgrade() else { break };
                Self { inner }.sweep_expired().await;
            }
            tracing::debug!(target: "settlement::coordinator", "session sweeper stopped");
        })
    }

    /// Completes every monitoring session and stops the background tasks.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let active: Vec<_> = self
            .inner
            .sessions
            .lock()
            .sessions
            .values()
            .filter(|entry| entry.session.is_active())
            .map(|entry| entry.session.id)
            .collect();
        for session_id in active {
            if let Err(err) = self.finish_session(session_id, SessionStatus::Completed).await {
                tracing::error!(target: "settlement::coordinator", session = %session_id, %err, "failed to complete session on shutdown");
            }
        }
        self.inner.monitors.shutdown().await;
    }
}

/// Hands the batches detected by the monitor of a session to the coordinator.
#[derive(Debug)]
struct SessionBatchHandler {
    session_id: SessionId,
    coordinator: Weak<Inner>,
}

#[async_trait::async_trait]
impl BatchHandler for SessionBatchHandler {
    async fn handle_batch(&self, batch: DetectedBatch) {
        let Some(inner) = self.coordinator.upgrade() else { return };
        let coordinator = SessionCoordinator { inner };
        if let Err(err) = coordinator.handle_detected_batch(self.session_id, batch).await {
            tracing::error!(target: "settlement::coordinator", session = %self.session_id, %err, "failed to handle detected batch");
        }
    }
}
