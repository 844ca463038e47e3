use crate::{SessionId, SessionStatus};

/// An invalid tracking session lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTransitionError {
    /// The session which rejected the transition.
    pub session_id: SessionId,
    /// The current status of the session.
    pub from: SessionStatus,
    /// The requested status.
    pub to: SessionStatus,
}

impl core::fmt::Display for SessionTransitionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "session {} cannot transition from {} to {}", self.session_id, self.from, self.to)
    }
}

impl core::error::Error for SessionTransitionError {}
