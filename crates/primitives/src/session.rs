use crate::{NetworkId, SessionTransitionError, SECONDS_PER_HOUR};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};

/// The identifier of a tracking session.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The lifecycle status of a tracking session.
///
/// `Monitoring` is the only non-terminal status: a session moves out of it exactly once.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The session is polling L1 for batches.
    #[default]
    Monitoring,
    /// The monitoring duration elapsed or the session was stopped.
    Completed,
    /// The session could not connect to its chains.
    Failed,
    /// The session was force-stopped by the age sweep.
    Timeout,
}

impl SessionStatus {
    /// Returns true if no transition out of the status exists.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Monitoring)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(self, Self::Monitoring) && next.is_terminal()
    }
}

impl core::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Monitoring => write!(f, "monitoring"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// The request to start a tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// The L1 network to watch for batches.
    pub l1_network_id: NetworkId,
    /// The L2 network whose transactions are tracked.
    pub l2_network_id: NetworkId,
    /// How long the session monitors before completing, in hours.
    pub monitoring_duration_hours: f64,
    /// Batch posters replacing the ones of the rollup profile for this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_poster_addresses: Option<HashSet<Address>>,
}

impl SessionConfig {
    /// Returns a new [`SessionConfig`] without poster override.
    pub fn new(
        l1_network_id: impl Into<NetworkId>,
        l2_network_id: impl Into<NetworkId>,
        monitoring_duration_hours: f64,
    ) -> Self {
        Self {
            l1_network_id: l1_network_id.into(),
            l2_network_id: l2_network_id.into(),
            monitoring_duration_hours,
            batch_poster_addresses: None,
        }
    }

    /// Sets the batch poster override.
    pub fn with_batch_posters(mut self, posters: impl IntoIterator<Item = Address>) -> Self {
        self.batch_poster_addresses = Some(posters.into_iter().collect());
        self
    }
}

/// A tracking session, owned by the session coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSession {
    /// The session identifier.
    pub id: SessionId,
    /// The L1 network.
    pub l1_network_id: NetworkId,
    /// The L2 network.
    pub l2_network_id: NetworkId,
    /// Unix timestamp at which the session started, in seconds.
    pub started_at: u64,
    /// The configured monitoring duration, in hours.
    pub monitoring_duration_hours: f64,
    /// The lifecycle status.
    pub status: SessionStatus,
    /// Unix timestamp at which the session left `Monitoring`, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    /// The batch poster override of the session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_poster_addresses: Option<HashSet<Address>>,
}

impl TrackingSession {
    /// Returns a new monitoring session from its start request.
    pub fn new(id: SessionId, config: SessionConfig, started_at: u64) -> Self {
        Self {
            id,
            l1_network_id: config.l1_network_id,
            l2_network_id: config.l2_network_id,
            started_at,
            monitoring_duration_hours: config.monitoring_duration_hours,
            status: SessionStatus::Monitoring,
            ended_at: None,
            batch_poster_addresses: config.batch_poster_addresses,
        }
    }

    /// Returns true while the session is monitoring.
    pub const fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Returns the configured monitoring duration. Negative or NaN durations are zero, durations
    /// too large to represent saturate.
    pub fn monitoring_duration(&self) -> Duration {
        let secs = self.monitoring_duration_hours * SECONDS_PER_HOUR as f64;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Returns the age of the session at `now`, in seconds.
    pub const fn age_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }

    /// Moves the session to `status`, recording the end time.
    pub fn try_transition(
        &mut self,
        status: SessionStatus,
        now: u64,
    ) -> Result<(), SessionTransitionError> {
        if !self.status.can_transition_to(status) {
            return Err(SessionTransitionError {
                session_id: self.id,
                from: self.status,
                to: status,
            })
        }
        self.status = status;
        self.ended_at = Some(now);
        Ok(())
    }
}
