//! Round coordinator orchestrating the aggregation pipeline.
//!
//! Ingest updates, gate on readiness, then run one round end-to-end:
//! snapshot selection, per-model noise injection and federated averaging,
//! result persistence, consumed-flag marking, round bookkeeping.

use crate::aggregation::federated_average;
use crate::config::FederationConfig;
use crate::core::{now, Error, ModelUpdate, Result, Timestamp, UpdateId};
use crate::monitoring::{FederationMetrics, MetricsRecorder};
use crate::privacy::NoiseInjector;
use crate::round::readiness::is_ready;
use crate::store::{AggregationRound, DeviceRegistry, RoundStatus, RoundStore, UpdateStore};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coordinates federated aggregation rounds over the storage collaborators.
///
/// Ingestion is safe to call from many tasks at once; `run_round` is
/// serialized system-wide through the round store's lease.
pub struct RoundCoordinator {
    config: FederationConfig,
    /// Lease owner identity of this coordinator instance
    owner_id: String,
    updates: Arc<dyn UpdateStore>,
    devices: Arc<dyn DeviceRegistry>,
    rounds: Arc<dyn RoundStore>,
    noise: NoiseInjector,
    metrics: MetricsRecorder,
}

impl RoundCoordinator {
    /// Create a coordinator over the given stores.
    ///
    /// Fails with `InvalidParameter` when the config's privacy parameters
    /// are out of range.
    pub fn new(
        config: FederationConfig,
        updates: Arc<dyn UpdateStore>,
        devices: Arc<dyn DeviceRegistry>,
        rounds: Arc<dyn RoundStore>,
    ) -> Result<Self> {
        let mut noise = NoiseInjector::new(config.epsilon, config.sensitivity)?;
        if let Some(threshold) = config.clipping_threshold {
            noise = noise.with_clipping(threshold);
        }

        Ok(Self {
            config,
            owner_id: uuid::Uuid::new_v4().to_string(),
            updates,
            devices,
            rounds,
            noise,
            metrics: MetricsRecorder::new(),
        })
    }

    /// Ingest one device submission as an update record.
    ///
    /// Rejects with `Validation` when the vector is empty, `samples_count`
    /// is zero, or the device is unknown or inactive. Accepted updates are
    /// appended unconsumed and become eligible for the next round.
    pub async fn ingest(
        &self,
        device_id: &str,
        model_name: &str,
        update_vector: Vec<f32>,
        samples_count: u64,
        now: Timestamp,
    ) -> Result<ModelUpdate> {
        if samples_count == 0 {
            self.metrics.update_rejected();
            return Err(Error::Validation(format!(
                "samples_count must be positive (device {device_id}, model {model_name})"
            )));
        }
        if update_vector.is_empty() {
            self.metrics.update_rejected();
            return Err(Error::Validation(format!(
                "update vector is empty (device {device_id}, model {model_name})"
            )));
        }
        if !self.devices.is_active(device_id).await? {
            self.metrics.update_rejected();
            return Err(Error::Validation(format!(
                "device not registered or inactive: {device_id}"
            )));
        }

        let update = ModelUpdate {
            id: UpdateId::generate(),
            device_id: device_id.to_string(),
            model_name: model_name.to_string(),
            update_vector,
            samples_count,
            created_at: now,
            consumed: false,
        };

        self.updates.append(update.clone()).await?;
        self.devices.touch(device_id, now).await?;
        self.metrics.update_ingested();
        debug!(
            device_id,
            model_name, samples_count, "ingested model update"
        );

        Ok(update)
    }

    /// Run the readiness gate and, when it passes, a full round.
    ///
    /// Returns `None` when not enough distinct devices contributed within
    /// the readiness window. A `ConcurrentRound` error means another round
    /// holds the lease; the periodic scheduler simply retries on its next
    /// tick.
    pub async fn check_and_maybe_run(&self, now: Timestamp) -> Result<Option<AggregationRound>> {
        let unconsumed = self.updates.unconsumed().await?;
        let ready = is_ready(
            &unconsumed,
            self.config.min_devices,
            self.config.readiness_window(),
            now,
        )?;

        if !ready {
            debug!(
                min_devices = self.config.min_devices,
                "aggregation not ready"
            );
            return Ok(None);
        }

        self.run_round(now).await.map(Some)
    }

    /// Execute one aggregation round.
    ///
    /// Fails fast with `ConcurrentRound` when another round holds the
    /// lease. Round-level failures (no updates, no aggregable model) are
    /// not errors: the returned round carries status `Failed` and its
    /// error message, and every selected update stays unconsumed for
    /// retry.
    pub async fn run_round(&self, now: Timestamp) -> Result<AggregationRound> {
        let mut round = self
            .rounds
            .begin(now, &self.owner_id, self.config.lease_ttl())
            .await?;
        info!(round = round.round_number, "aggregation round started");

        // Full unconsumed snapshot, deliberately unwindowed: a triggered
        // round folds in everything not yet consumed.
        let selected = self.updates.unconsumed().await?;

        if selected.is_empty() {
            return self.fail_round(round, "no updates available", now).await;
        }

        let mut by_model: BTreeMap<String, Vec<ModelUpdate>> = BTreeMap::new();
        for update in &selected {
            by_model
                .entry(update.model_name.clone())
                .or_default()
                .push(update.clone());
        }

        let mut failures: Vec<String> = Vec::new();
        for (model_name, group) in &by_model {
            let privatized = self.noise.privatize(group);
            match federated_average(model_name, &privatized) {
                Ok(global) => {
                    debug!(
                        model = model_name.as_str(),
                        updates = group.len(),
                        "model aggregated"
                    );
                    self.metrics.model_aggregated();
                    round.global_models.insert(model_name.clone(), global);
                }
                Err(err) => {
                    // One bad model group must not sink the others.
                    warn!(
                        model = model_name.as_str(),
                        error = %err,
                        "skipping model group"
                    );
                    self.metrics.model_group_skipped();
                    failures.push(format!("{model_name}: {err}"));
                }
            }
        }

        if round.global_models.is_empty() {
            let summary = failures.join("; ");
            return self.fail_round(round, &summary, now).await;
        }

        let participating: HashSet<&str> =
            selected.iter().map(|u| u.device_id.as_str()).collect();
        round.participating_device_count = participating.len() as u64;
        round.included_update_ids = selected.iter().map(|u| u.id.clone()).collect();
        round.status = RoundStatus::Completed;
        round.completed_at = Some(now);

        // Commit order matters: the round record names its update IDs
        // before any flag is set, so a crash in between is recoverable by
        // re-marking from the record (see resume_recovery).
        self.rounds.finish(round.clone()).await?;
        self.updates.mark_consumed(&round.included_update_ids).await?;

        self.metrics.round_completed();
        info!(
            round = round.round_number,
            devices = round.participating_device_count,
            models = round.global_models.len(),
            "aggregation round completed"
        );

        Ok(round)
    }

    /// Latest completed round, for publishing global models to devices.
    pub async fn latest_completed_round(&self) -> Result<Option<AggregationRound>> {
        self.rounds.latest_completed().await
    }

    /// Fail in-progress rounds whose lease expired (crashed owner).
    ///
    /// Run periodically alongside `check_and_maybe_run`; without it a
    /// crash mid-round would block every future round.
    pub async fn recover_stale_rounds(&self, now: Timestamp) -> Result<Vec<u64>> {
        let swept = self.rounds.expire_stale(now).await?;
        if !swept.is_empty() {
            warn!(rounds = ?swept, "recovered stale in-progress rounds");
            self.metrics.stale_rounds_recovered(swept.len() as u64);
        }
        Ok(swept)
    }

    /// Re-mark consumed flags from the latest completed round's ID list.
    ///
    /// Idempotent repair for a crash between the round commit and the
    /// flag updates. Returns the number of updates re-marked.
    pub async fn resume_recovery(&self) -> Result<usize> {
        let Some(latest) = self.rounds.latest_completed().await? else {
            return Ok(0);
        };

        let mut unmarked = Vec::new();
        for id in &latest.included_update_ids {
            if let Some(update) = self.updates.get(id).await? {
                if !update.consumed {
                    unmarked.push(id.clone());
                }
            }
        }
        if !unmarked.is_empty() {
            warn!(
                round = latest.round_number,
                updates = unmarked.len(),
                "re-marking consumed flags from round record"
            );
            self.updates.mark_consumed(&unmarked).await?;
        }
        Ok(unmarked.len())
    }

    /// Snapshot of the federation counters.
    pub fn metrics(&self) -> FederationMetrics {
        self.metrics.snapshot()
    }

    /// Lease owner ID of this coordinator instance.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    async fn fail_round(
        &self,
        mut round: AggregationRound,
        message: &str,
        at: Timestamp,
    ) -> Result<AggregationRound> {
        warn!(
            round = round.round_number,
            error = message,
            "aggregation round failed"
        );
        round.status = RoundStatus::Failed;
        round.error_message = Some(message.to_string());
        round.completed_at = Some(at);
        self.rounds.finish(round.clone()).await?;
        self.metrics.round_failed();
        Ok(round)
    }
}

/// Convenience: coordinator wired to fresh in-memory stores.
pub fn in_memory_coordinator(config: FederationConfig) -> Result<RoundCoordinator> {
    use crate::store::{MemoryDeviceRegistry, MemoryRoundStore, MemoryUpdateStore};

    RoundCoordinator::new(
        config,
        Arc::new(MemoryUpdateStore::new()),
        Arc::new(MemoryDeviceRegistry::new()),
        Arc::new(MemoryRoundStore::new()),
    )
}

/// Run both crash-recovery sweeps once, typically at process startup.
pub async fn sweep_on_startup(coordinator: &RoundCoordinator) -> Result<()> {
    coordinator.recover_stale_rounds(now()).await?;
    coordinator.resume_recovery().await?;
    Ok(())
}
