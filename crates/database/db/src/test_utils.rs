//! Test utilities for storage.

use crate::{DatabaseError, InMemoryDatabase, Storage};

use settlement_primitives::{PendingRecord, RecordId, SessionId, TrackingSession};
use std::sync::atomic::{AtomicUsize, Ordering};

/// An [`InMemoryDatabase`] whose record updates fail a configurable number of times.
#[derive(Debug, Default)]
pub struct FlakyDatabase {
    inner: InMemoryDatabase,
    failing_updates: AtomicUsize,
}

impl FlakyDatabase {
    /// Fails the next `count` record updates with [`DatabaseError::Backend`].
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        self.failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl Storage for FlakyDatabase {
    async fn save_session(&self, session: &TrackingSession) -> Result<(), DatabaseError> {
        self.inner.save_session(session).await
    }

    async fn update_session(&self, session: &TrackingSession) -> Result<(), DatabaseError> {
        self.inner.update_session(session).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<TrackingSession>, DatabaseError> {
        self.inner.get_session(id).await
    }

    async fn list_sessions(&self) -> Result<Vec<TrackingSession>, DatabaseError> {
        self.inner.list_sessions().await
    }

    async fn save_record(&self, record: &PendingRecord) -> Result<(), DatabaseError> {
        self.inner.save_record(record).await
    }

    async fn update_record(&self, record: &PendingRecord) -> Result<(), DatabaseError> {
        if self.should_fail() {
            return Err(DatabaseError::Backend("database is locked".to_string()))
        }
        self.inner.update_record(record).await
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<PendingRecord>, DatabaseError> {
        self.inner.get_record(id).await
    }

    async fn find_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<PendingRecord>, DatabaseError> {
        self.inner.find_by_session(session_id).await
    }
}
