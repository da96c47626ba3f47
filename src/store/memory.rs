//! In-memory store implementations.
//!
//! Reference backends used in tests and single-process deployments. A
//! production deployment would put PostgreSQL (sqlx) behind the same
//! traits.

use crate::core::{Device, DeviceStatus, Error, ModelUpdate, Result, Timestamp, UpdateId};
use crate::store::device::DeviceRegistry;
use crate::store::round::{AggregationRound, RoundStatus, RoundStore};
use crate::store::update::UpdateStore;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// In-memory update store.
///
/// Append-order is preserved; records are never removed.
pub struct MemoryUpdateStore {
    updates: RwLock<Vec<ModelUpdate>>,
}

impl MemoryUpdateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            updates: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryUpdateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateStore for MemoryUpdateStore {
    async fn append(&self, update: ModelUpdate) -> Result<UpdateId> {
        let id = update.id.clone();
        let mut updates = self.updates.write().unwrap();
        updates.push(update);
        Ok(id)
    }

    async fn get(&self, id: &UpdateId) -> Result<Option<ModelUpdate>> {
        let updates = self.updates.read().unwrap();
        Ok(updates.iter().find(|u| &u.id == id).cloned())
    }

    async fn unconsumed(&self) -> Result<Vec<ModelUpdate>> {
        let updates = self.updates.read().unwrap();
        Ok(updates.iter().filter(|u| !u.consumed).cloned().collect())
    }

    async fn mark_consumed(&self, ids: &[UpdateId]) -> Result<()> {
        let mut updates = self.updates.write().unwrap();
        for update in updates.iter_mut() {
            if ids.contains(&update.id) {
                update.consumed = true;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let updates = self.updates.read().unwrap();
        Ok(updates.len() as u64)
    }
}

/// In-memory device registry.
pub struct MemoryDeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl MemoryDeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryDeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn register(&self, device: Device) -> Result<()> {
        let mut devices = self.devices.write().unwrap();
        devices
            .entry(device.device_id.clone())
            .and_modify(|d| {
                d.status = DeviceStatus::Active;
                d.last_seen = device.last_seen;
            })
            .or_insert(device);
        Ok(())
    }

    async fn touch(&self, device_id: &str, now: Timestamp) -> Result<()> {
        let mut devices = self.devices.write().unwrap();
        match devices.get_mut(device_id) {
            Some(device) => {
                device.last_seen = now;
                Ok(())
            }
            None => Err(Error::Validation(format!(
                "unknown device: {device_id}"
            ))),
        }
    }

    async fn get(&self, device_id: &str) -> Result<Option<Device>> {
        let devices = self.devices.read().unwrap();
        Ok(devices.get(device_id).cloned())
    }

    async fn active_count(&self) -> Result<u64> {
        let devices = self.devices.read().unwrap();
        Ok(devices
            .values()
            .filter(|d| d.status == DeviceStatus::Active)
            .count() as u64)
    }
}

/// In-memory round store.
///
/// A single mutex guards the claim-next-round-number step, which is the
/// system-wide mutual-exclusion point.
pub struct MemoryRoundStore {
    rounds: Mutex<Vec<AggregationRound>>,
}

impl MemoryRoundStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rounds: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryRoundStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoundStore for MemoryRoundStore {
    async fn begin(
        &self,
        now: Timestamp,
        owner_id: &str,
        lease_ttl: Duration,
    ) -> Result<AggregationRound> {
        let mut rounds = self.rounds.lock().unwrap();

        for round in rounds.iter_mut() {
            if round.status != RoundStatus::InProgress {
                continue;
            }
            if round.lease_live(now) {
                return Err(Error::ConcurrentRound);
            }
            // Expired lease: the owner crashed mid-round. Fail it here so
            // the new claim does not deadlock on a dead owner.
            round.status = RoundStatus::Failed;
            round.completed_at = Some(now);
            round.error_message = Some("round lease expired".to_string());
        }

        let round = AggregationRound::begin(rounds.len() as u64 + 1, owner_id, now, lease_ttl);
        rounds.push(round.clone());
        Ok(round)
    }

    async fn finish(&self, round: AggregationRound) -> Result<()> {
        let mut rounds = self.rounds.lock().unwrap();
        match rounds
            .iter_mut()
            .find(|r| r.round_number == round.round_number)
        {
            Some(stored) => {
                *stored = round;
                Ok(())
            }
            None => Err(Error::RoundNotFound(round.round_number)),
        }
    }

    async fn get(&self, round_number: u64) -> Result<Option<AggregationRound>> {
        let rounds = self.rounds.lock().unwrap();
        Ok(rounds
            .iter()
            .find(|r| r.round_number == round_number)
            .cloned())
    }

    async fn latest_completed(&self) -> Result<Option<AggregationRound>> {
        let rounds = self.rounds.lock().unwrap();
        Ok(rounds
            .iter()
            .filter(|r| r.status == RoundStatus::Completed)
            .max_by_key(|r| r.round_number)
            .cloned())
    }

    async fn expire_stale(&self, now: Timestamp) -> Result<Vec<u64>> {
        let mut rounds = self.rounds.lock().unwrap();
        let mut swept = Vec::new();
        for round in rounds.iter_mut() {
            if round.status == RoundStatus::InProgress && !round.lease_live(now) {
                round.status = RoundStatus::Failed;
                round.completed_at = Some(now);
                round.error_message = Some("round lease expired".to_string());
                swept.push(round.round_number);
            }
        }
        Ok(swept)
    }

    async fn count(&self) -> Result<u64> {
        let rounds = self.rounds.lock().unwrap();
        Ok(rounds.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::now;

    fn update(device: &str, model: &str) -> ModelUpdate {
        ModelUpdate {
            id: UpdateId::generate(),
            device_id: device.to_string(),
            model_name: model.to_string(),
            update_vector: vec![1.0, 2.0],
            samples_count: 10,
            created_at: now(),
            consumed: false,
        }
    }

    #[tokio::test]
    async fn test_append_and_snapshot() {
        let store = MemoryUpdateStore::new();
        let id = store.append(update("dev-a", "m")).await.unwrap();
        store.append(update("dev-b", "m")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.unconsumed().await.unwrap().len(), 2);

        store.mark_consumed(&[id.clone()]).await.unwrap();
        assert_eq!(store.unconsumed().await.unwrap().len(), 1);
        // Consumed record still readable (audit trail)
        assert!(store.get(&id).await.unwrap().unwrap().consumed);
    }

    #[tokio::test]
    async fn test_mark_consumed_idempotent() {
        let store = MemoryUpdateStore::new();
        let id = store.append(update("dev-a", "m")).await.unwrap();

        store.mark_consumed(&[id.clone()]).await.unwrap();
        store.mark_consumed(&[id.clone()]).await.unwrap();
        assert!(store.get(&id).await.unwrap().unwrap().consumed);
    }

    #[tokio::test]
    async fn test_register_reactivates() {
        let registry = MemoryDeviceRegistry::new();
        let t = now();
        let mut device = Device::new("dev-a", t);
        device.status = DeviceStatus::Inactive;
        registry.register(device).await.unwrap();
        // or_insert keeps the given record but and_modify re-activates a
        // known one
        registry.register(Device::new("dev-a", t)).await.unwrap();
        assert!(registry.is_active("dev-a").await.unwrap());
        assert_eq!(registry.active_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_touch_unknown_device() {
        let registry = MemoryDeviceRegistry::new();
        assert!(registry.touch("ghost", now()).await.is_err());
    }

    #[tokio::test]
    async fn test_begin_serializes_rounds() {
        let store = MemoryRoundStore::new();
        let t = now();
        let first = store.begin(t, "owner-a", Duration::minutes(15)).await.unwrap();
        assert_eq!(first.round_number, 1);

        let second = store.begin(t, "owner-b", Duration::minutes(15)).await;
        assert!(matches!(second, Err(Error::ConcurrentRound)));
    }

    #[tokio::test]
    async fn test_expired_lease_unblocks_begin() {
        let store = MemoryRoundStore::new();
        let t = now();
        store.begin(t, "owner-a", Duration::minutes(15)).await.unwrap();

        let later = t + Duration::minutes(16);
        let next = store.begin(later, "owner-b", Duration::minutes(15)).await.unwrap();
        assert_eq!(next.round_number, 2);

        // Crashed round was failed, not lost
        let first = store.get(1).await.unwrap().unwrap();
        assert_eq!(first.status, RoundStatus::Failed);
        assert!(first.error_message.unwrap().contains("lease expired"));
    }

    #[tokio::test]
    async fn test_expire_stale_sweep() {
        let store = MemoryRoundStore::new();
        let t = now();
        store.begin(t, "owner-a", Duration::minutes(15)).await.unwrap();

        assert!(store.expire_stale(t).await.unwrap().is_empty());
        let swept = store.expire_stale(t + Duration::minutes(16)).await.unwrap();
        assert_eq!(swept, vec![1]);
    }

    #[tokio::test]
    async fn test_latest_completed() {
        let store = MemoryRoundStore::new();
        let t = now();
        assert!(store.latest_completed().await.unwrap().is_none());

        let mut round = store.begin(t, "owner-a", Duration::minutes(15)).await.unwrap();
        round.status = RoundStatus::Completed;
        round.completed_at = Some(t);
        store.finish(round).await.unwrap();

        let latest = store.latest_completed().await.unwrap().unwrap();
        assert_eq!(latest.round_number, 1);
    }

    #[tokio::test]
    async fn test_finish_unknown_round() {
        let store = MemoryRoundStore::new();
        let round = AggregationRound::begin(7, "owner-a", now(), Duration::minutes(15));
        assert!(matches!(
            store.finish(round).await,
            Err(Error::RoundNotFound(7))
        ));
    }
}
