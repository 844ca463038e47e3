use crate::{DatabaseError, Storage};

use parking_lot::RwLock;
use settlement_primitives::{PendingRecord, RecordId, SessionId, TrackingSession};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A [`Storage`] keeping every table in memory.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    sessions: BTreeMap<SessionId, TrackingSession>,
    records: BTreeMap<RecordId, PendingRecord>,
    records_by_session: HashMap<SessionId, BTreeSet<RecordId>>,
}

impl InMemoryDatabase {
    /// Returns a new empty [`InMemoryDatabase`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn record_count(&self) -> usize {
        self.tables.read().records.len()
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryDatabase {
    async fn save_session(&self, session: &TrackingSession) -> Result<(), DatabaseError> {
        tracing::trace!(target: "settlement::db", session_id = %session.id, status = %session.status, "Inserting session into database.");
        self.tables.write().sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &TrackingSession) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.sessions.get_mut(&session.id) else {
            tracing::error!(target: "settlement::db", session_id = %session.id, "Session not found in DB when trying to update.");
            return Err(DatabaseError::SessionNotFound(session.id))
        };
        tracing::trace!(target: "settlement::db", session_id = %session.id, status = %session.status, "Updating session in database.");
        *stored = session.clone();
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<TrackingSession>, DatabaseError> {
        Ok(self.tables.read().sessions.get(&id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<TrackingSession>, DatabaseError> {
        Ok(self.tables.read().sessions.values().cloned().collect())
    }

    async fn save_record(&self, record: &PendingRecord) -> Result<(), DatabaseError> {
        tracing::trace!(target: "settlement::db", record_id = %record.id, session_id = %record.session_id, l2_tx_hash = ?record.l2_tx_hash, "Inserting record into database.");
        let mut tables = self.tables.write();
        tables.records_by_session.entry(record.session_id).or_default().insert(record.id);
        tables.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_record(&self, record: &PendingRecord) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.records.get_mut(&record.id) else {
            tracing::error!(target: "settlement::db", record_id = %record.id, "Record not found in DB when trying to update.");
            return Err(DatabaseError::RecordNotFound(record.id))
        };
        *stored = record.clone();
        Ok(())
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<PendingRecord>, DatabaseError> {
        Ok(self.tables.read().records.get(&id).cloned())
    }

    async fn find_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<PendingRecord>, DatabaseError> {
        let tables = self.tables.read();
        Ok(tables
            .records_by_session
            .get(&session_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.records.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use settlement_primitives::{L2BlockMeta, SessionConfig, SessionStatus};

    fn record(id: u64, session: u64) -> PendingRecord {
        PendingRecord::new(
            RecordId(id),
            SessionId(session),
            B256::repeat_byte(id as u8),
            L2BlockMeta { block_number: 100 + id, confirmation_time: 1_000 + id },
        )
    }

    #[tokio::test]
    async fn test_records_are_grouped_by_session() -> eyre::Result<()> {
        let db = InMemoryDatabase::new();
        for (id, session) in [(1, 1), (2, 2), (3, 1)] {
            db.save_record(&record(id, session)).await?;
        }

        let records = db.find_by_session(SessionId(1)).await?;
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RecordId(1), RecordId(3)]);
        assert!(db.find_by_session(SessionId(9)).await?.is_empty());
        assert_eq!(db.record_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_record_fails() {
        let db = InMemoryDatabase::new();
        let err = db.update_record(&record(7, 1)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::RecordNotFound(RecordId(7))));
    }

    #[tokio::test]
    async fn test_find_unsettled_skips_settled_records() -> eyre::Result<()> {
        let db = InMemoryDatabase::new();
        db.save_record(&record(1, 1)).await?;
        db.save_record(&record(2, 1)).await?;

        let mut settled = db.get_record(RecordId(2)).await?.unwrap();
        settled.l1_settlement_info = Some(settlement_primitives::L1SettlementInfo {
            l1_tx_hash: B256::ZERO,
            l1_block_number: 10,
            l1_timestamp: 2_000,
            settlement_time_ms: 998_000,
            l2_block_range: settlement_primitives::L2BlockRange::new(1, 200),
            estimated_batch_size: 1_000,
            cost: Default::default(),
        });
        db.update_record(&settled).await?;

        let unsettled = db.find_unsettled_by_session(SessionId(1)).await?;
        assert_eq!(unsettled.len(), 1);
        assert_eq!(unsettled[0].id, RecordId(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_session_round_trip() -> eyre::Result<()> {
        let db = InMemoryDatabase::new();
        let mut session = TrackingSession::new(
            SessionId(1),
            SessionConfig::new("sepolia", "base-sepolia", 1.0),
            1_000,
        );
        assert!(db.update_session(&session).await.is_err());

        db.save_session(&session).await?;
        session.try_transition(SessionStatus::Completed, 2_000)?;
        db.update_session(&session).await?;

        let stored = db.get_session(SessionId(1)).await?.unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(db.list_sessions().await?.len(), 1);
        Ok(())
    }
}
