use crate::{BatchHandler, BatchMonitor, MonitorConfig, MonitorError};

use parking_lot::Mutex;
use settlement_primitives::{NetworkId, RollupProfile, SessionId};
use settlement_providers::{ChainClientPool, ChainConnector};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runs at most one [`BatchMonitor`] per session.
#[derive(Debug)]
pub struct BatchMonitorService<C> {
    pool: Arc<ChainClientPool<C>>,
    config: MonitorConfig,
    monitors: Mutex<HashMap<SessionId, MonitorHandle>>,
}

#[derive(Debug)]
struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<C: ChainConnector + 'static> BatchMonitorService<C> {
    /// Returns a new [`BatchMonitorService`] opening its clients from the pool.
    pub fn new(pool: Arc<ChainClientPool<C>>, config: MonitorConfig) -> Self {
        Self { pool, config, monitors: Mutex::new(HashMap::new()) }
    }

    /// Spawns the monitor of the session, watching `l1_network` for batches of the profile.
    pub async fn start<H: BatchHandler + 'static>(
        &self,
        session_id: SessionId,
        profile: Arc<RollupProfile>,
        l1_network: &NetworkId,
        handler: H,
    ) -> Result<(), MonitorError> {
        if self.is_monitoring(session_id) {
            return Err(MonitorError::AlreadyMonitoring(session_id))
        }
        if &profile.l1_network_id != l1_network {
            tracing::warn!(target: "settlement::watcher", session = %session_id, network = %profile.network_id, settles_to = %profile.l1_network_id, requested = %l1_network, "rollup does not settle to the requested L1");
            return Err(MonitorError::UnsupportedNetwork(l1_network.clone()))
        }

        if profile.batch_poster_addresses.is_empty() {
            return Err(MonitorError::NoBatchPosters(profile.network_id.clone()))
        }

        let clients = async {
            let l1 = self.pool.acquire(session_id, l1_network).await?;
            let l2 = self.pool.acquire(session_id, &profile.network_id).await?;
            Ok::<_, MonitorError>((l1, l2))
        };
        let (l1, l2) = match clients.await {
            Ok(clients) => clients,
            Err(err) => {
                self.pool.release(session_id);
                return Err(err)
            }
        };

        let monitor = BatchMonitor::new(session_id, profile, l1, l2, handler, self.config);
        let cancel = CancellationToken::new();

        let mut monitors = self.monitors.lock();
        match monitors.entry(session_id) {
            Entry::Occupied(_) => Err(MonitorError::AlreadyMonitoring(session_id)),
            Entry::Vacant(entry) => {
                let task = tokio::spawn(monitor.run(cancel.clone()));
                entry.insert(MonitorHandle { cancel, task });
                Ok(())
            }
        }
    }

    /// Stops the monitor of the session and releases its clients. No tick runs once this
    /// returns. Returns false if the session had no running monitor.
    pub async fn stop(&self, session_id: SessionId) -> bool {
        let handle = self.monitors.lock().remove(&session_id);
        let Some(MonitorHandle { cancel, task }) = handle else { return false };

        cancel.cancel();
        if let Err(err) = task.await {
            tracing::error!(target: "settlement::watcher", session = %session_id, %err, "batch monitor task failed");
        }
        for network in self.pool.release(session_id) {
            tracing::debug!(target: "settlement::watcher", session = %session_id, %network, "released last reference to chain client");
        }
        true
    }

    /// Returns true if the session has a running monitor.
    pub fn is_monitoring(&self, session_id: SessionId) -> bool {
        self.monitors.lock().contains_key(&session_id)
    }

    /// Returns the number of running monitors.
    pub fn active_monitors(&self) -> usize {
        self.monitors.lock().len()
    }

    /// Stops every running monitor.
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self.monitors.lock().keys().copied().collect();
        for session_id in sessions {
            self.stop(session_id).await;
        }
    }
}
