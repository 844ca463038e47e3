use crate::DatabaseError;

use settlement_primitives::{PendingRecord, RecordId, SessionId, TrackingSession};

/// The [`Storage`] trait provides the persistence operations of the tracker.
///
/// Implementations must be safe to call concurrently from the monitor, the coordinator and
/// readers of results.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Insert a new [`TrackingSession`].
    async fn save_session(&self, session: &TrackingSession) -> Result<(), DatabaseError>;

    /// Replace a stored [`TrackingSession`].
    ///
    /// Errors with [`DatabaseError::SessionNotFound`] if the session was never saved.
    async fn update_session(&self, session: &TrackingSession) -> Result<(), DatabaseError>;

    /// Get a [`TrackingSession`] by its id.
    async fn get_session(&self, id: SessionId) -> Result<Option<TrackingSession>, DatabaseError>;

    /// Get all the sessions, ordered by id.
    async fn list_sessions(&self) -> Result<Vec<TrackingSession>, DatabaseError>;

    /// Insert a new [`PendingRecord`].
    async fn save_record(&self, record: &PendingRecord) -> Result<(), DatabaseError>;

    /// Replace a stored [`PendingRecord`].
    ///
    /// Errors with [`DatabaseError::RecordNotFound`] if the record was never saved.
    async fn update_record(&self, record: &PendingRecord) -> Result<(), DatabaseError>;

    /// Get a [`PendingRecord`] by its id.
    async fn get_record(&self, id: RecordId) -> Result<Option<PendingRecord>, DatabaseError>;

    /// Get the records of a session, ordered by id.
    async fn find_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<PendingRecord>, DatabaseError>;

    /// Get the records of a session which were not attributed to a batch yet.
    async fn find_unsettled_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<PendingRecord>, DatabaseError> {
        let mut records = self.find_by_session(session_id).await?;
        records.retain(|record| !record.is_settled());
        Ok(records)
    }
}
