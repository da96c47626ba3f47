//! Federation counters.
//!
//! Operational counters mirroring what a metrics exporter would publish.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of federation counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FederationMetrics {
    pub updates_ingested: u64,
    pub updates_rejected: u64,
    pub rounds_completed: u64,
    pub rounds_failed: u64,
    pub models_aggregated: u64,
    pub model_groups_skipped: u64,
    pub stale_rounds_recovered: u64,
}

/// Lock-free counter set shared across the ingestion and round paths.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    updates_ingested: AtomicU64,
    updates_rejected: AtomicU64,
    rounds_completed: AtomicU64,
    rounds_failed: AtomicU64,
    models_aggregated: AtomicU64,
    model_groups_skipped: AtomicU64,
    stale_rounds_recovered: AtomicU64,
}

impl MetricsRecorder {
    /// Create a zeroed recorder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_ingested(&self) {
        self.updates_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_rejected(&self) {
        self.updates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_completed(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_failed(&self) {
        self.rounds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn model_aggregated(&self) {
        self.models_aggregated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn model_group_skipped(&self) {
        self.model_groups_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_rounds_recovered(&self, count: u64) {
        self.stale_rounds_recovered
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Snapshot current counter values.
    pub fn snapshot(&self) -> FederationMetrics {
        FederationMetrics {
            updates_ingested: self.updates_ingested.load(Ordering::Relaxed),
            updates_rejected: self.updates_rejected.load(Ordering::Relaxed),
            rounds_completed: self.rounds_completed.load(Ordering::Relaxed),
            rounds_failed: self.rounds_failed.load(Ordering::Relaxed),
            models_aggregated: self.models_aggregated.load(Ordering::Relaxed),
            model_groups_skipped: self.model_groups_skipped.load(Ordering::Relaxed),
            stale_rounds_recovered: self.stale_rounds_recovered.load(Ordering::Relaxed),
        }
    }
}
