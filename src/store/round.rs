//! Round record store and the in-progress lease.
//!
//! The round store is the serialization point of the whole system: at most
//! one round may hold a live lease at a time.

use crate::core::{Result, Timestamp, UpdateId};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of an aggregation round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Created but not yet started (never persisted; kept for audit
    /// compatibility with upstream round schemas)
    Pending,
    /// Holding the lease, aggregation underway
    InProgress,
    /// Terminal: global models published
    Completed,
    /// Terminal: no models could be aggregated, or the lease expired
    Failed,
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundStatus::Pending => write!(f, "pending"),
            RoundStatus::InProgress => write!(f, "in_progress"),
            RoundStatus::Completed => write!(f, "completed"),
            RoundStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One aggregation round, from lease claim to terminal state.
///
/// Terminal rounds are never reopened. `included_update_ids` records
/// exactly which updates were folded in, so consumed-flag marking can be
/// replayed idempotently after a crash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregationRound {
    /// 1-based, strictly increasing, gapless for started rounds
    pub round_number: u64,
    /// Current lifecycle state
    pub status: RoundStatus,
    /// Lease owner (one coordinator instance)
    pub owner_id: String,
    /// Round start timestamp
    pub started_at: Timestamp,
    /// Terminal-state timestamp
    pub completed_at: Option<Timestamp>,
    /// Lease expiry; an in-progress round past this point is considered
    /// crashed
    pub lease_expires_at: Timestamp,
    /// Distinct devices whose updates were folded into this round
    pub participating_device_count: u64,
    /// Aggregated global vector per model name
    pub global_models: HashMap<String, Vec<f32>>,
    /// IDs of the updates folded into this round
    pub included_update_ids: Vec<UpdateId>,
    /// Present iff status is Failed
    pub error_message: Option<String>,
}

impl AggregationRound {
    /// Create a fresh in-progress round holding the lease.
    pub fn begin(round_number: u64, owner_id: &str, now: Timestamp, lease_ttl: Duration) -> Self {
        Self {
            round_number,
            status: RoundStatus::InProgress,
            owner_id: owner_id.to_string(),
            started_at: now,
            completed_at: None,
            lease_expires_at: now + lease_ttl,
            participating_device_count: 0,
            global_models: HashMap::new(),
            included_update_ids: Vec::new(),
            error_message: None,
        }
    }

    /// Whether this round's lease is still live at `now`.
    pub fn lease_live(&self, now: Timestamp) -> bool {
        self.status == RoundStatus::InProgress && now < self.lease_expires_at
    }

    /// Whether the round reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RoundStatus::Completed | RoundStatus::Failed)
    }
}

/// Store of aggregation round records.
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// Atomically claim the next round number and persist an in-progress
    /// round record.
    ///
    /// Fails with [`Error::ConcurrentRound`](crate::core::Error) when a
    /// round with a live lease already exists. An in-progress round whose
    /// lease has expired does not block a new claim (it is marked failed
    /// by the same call, keeping round numbers gapless).
    async fn begin(
        &self,
        now: Timestamp,
        owner_id: &str,
        lease_ttl: Duration,
    ) -> Result<AggregationRound>;

    /// Persist the terminal state of a round (completed or failed).
    ///
    /// Fails with `RoundNotFound` if the round was never begun.
    async fn finish(&self, round: AggregationRound) -> Result<()>;

    /// Read a round by number.
    async fn get(&self, round_number: u64) -> Result<Option<AggregationRound>>;

    /// Latest completed round, if any.
    async fn latest_completed(&self) -> Result<Option<AggregationRound>>;

    /// Mark in-progress rounds with expired leases as failed.
    ///
    /// Returns the round numbers swept. This is the crash-recovery path:
    /// without it, a crashed coordinator would hold the lease forever.
    async fn expire_stale(&self, now: Timestamp) -> Result<Vec<u64>>;

    /// Total number of rounds ever begun.
    async fn count(&self) -> Result<u64>;
}
