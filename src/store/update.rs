//! Update store trait definition.
//!
//! Persistent, append-only store of per-device model updates.

use crate::core::{ModelUpdate, Result, UpdateId};
use async_trait::async_trait;

/// Store of ingested model updates.
///
/// Appends are independent and commutative: many devices submit
/// concurrently with no coordination between writers. Records are never
/// deleted; `mark_consumed` is the only mutation after ingestion.
#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Append a new update record.
    async fn append(&self, update: ModelUpdate) -> Result<UpdateId>;

    /// Read an update by ID.
    ///
    /// Returns None if the update doesn't exist.
    async fn get(&self, id: &UpdateId) -> Result<Option<ModelUpdate>>;

    /// Snapshot of all unconsumed updates.
    ///
    /// Updates ingested after the snapshot is taken belong to a later round.
    async fn unconsumed(&self) -> Result<Vec<ModelUpdate>>;

    /// Mark the given updates as consumed.
    ///
    /// Idempotent: already-consumed updates are left as-is, so crash
    /// recovery may safely re-mark from a round's recorded ID list.
    async fn mark_consumed(&self, ids: &[UpdateId]) -> Result<()>;

    /// Total number of stored updates (consumed or not).
    async fn count(&self) -> Result<u64> {
        Ok(0)
    }
}
