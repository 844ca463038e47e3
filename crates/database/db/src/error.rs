use settlement_primitives::{RecordId, SessionId};

/// The error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The record was not found in the database.
    #[error("record [{0}] not found in database")]
    RecordNotFound(RecordId),
    /// The session was not found in the database.
    #[error("session [{0}] not found in database")]
    SessionNotFound(SessionId),
    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}
