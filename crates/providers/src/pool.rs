use crate::{ChainClient, ChainClientError, ChainConnector};

use parking_lot::Mutex;
use settlement_primitives::{NetworkId, SessionId};
use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::Arc,
};

/// A pool of [`ChainClient`]s shared by sessions.
///
/// One client is opened per network and kept alive as long as at least one session holds it.
#[derive(Debug)]
pub struct ChainClientPool<C> {
    connector: C,
    clients: Mutex<HashMap<NetworkId, PooledClient>>,
}

#[derive(Debug)]
struct PooledClient {
    client: Arc<dyn ChainClient>,
    holders: HashSet<SessionId>,
}

impl<C: ChainConnector> ChainClientPool<C> {
    /// Returns a new empty [`ChainClientPool`].
    pub fn new(connector: C) -> Self {
        Self { connector, clients: Mutex::new(HashMap::new()) }
    }

    /// Returns the client of the network on behalf of the session, connecting if needed.
    pub async fn acquire(
        &self,
        session: SessionId,
        network: &NetworkId,
    ) -> Result<Arc<dyn ChainClient>, ChainClientError> {
        let pooled = self.clients.lock().get_mut(network).map(|pooled| {
            pooled.holders.insert(session);
            pooled.client.clone()
        });
        if let Some(client) = pooled {
            return Ok(client)
        }

        // connect without holding the lock, a concurrent acquire may win the race.
        let client = self.connector.connect(network).await?;
        let mut clients = self.clients.lock();
        let pooled = clients.entry(network.clone()).or_insert_with(|| {
            tracing::debug!(target: "settlement::providers", %network, "opened chain client");
            PooledClient { client, holders: HashSet::new() }
        });
        pooled.holders.insert(session);
        Ok(pooled.client.clone())
    }

    /// Releases every client held by the session. Returns the networks whose client was closed.
    pub fn release(&self, session: SessionId) -> Vec<NetworkId> {
        let mut clients = self.clients.lock();
        let mut closed = Vec::new();
        clients.retain(|network, pooled| {
            pooled.holders.remove(&session);
            let keep = !pooled.holders.is_empty();
            if !keep {
                closed.push(network.clone());
            }
            keep
        });
        for network in &closed {
            tracing::debug!(target: "settlement::providers", %network, %session, "closed chain client");
        }
        closed
    }

    /// Returns the number of sessions holding the client of the network.
    pub fn holders(&self, network: &NetworkId) -> usize {
        self.clients.lock().get(network).map(|pooled| pooled.holders.len()).unwrap_or_default()
    }

    /// Returns true if a client to the network is open.
    pub fn is_connected(&self, network: &NetworkId) -> bool {
        self.clients.lock().contains_key(network)
    }
}
