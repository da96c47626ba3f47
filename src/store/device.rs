//! Device registry trait definition.
//!
//! Active-device membership consumed by the aggregation core.

use crate::core::{Device, Result, Timestamp};
use async_trait::async_trait;

/// Registry of edge devices.
///
/// The aggregation core only reads membership (`is_active`); the
/// registration and heartbeat operations exist for the ingestion
/// collaborator that fronts the devices.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Register a device, or re-activate it if already known.
    async fn register(&self, device: Device) -> Result<()>;

    /// Record device contact (updates `last_seen`).
    async fn touch(&self, device_id: &str, now: Timestamp) -> Result<()>;

    /// Read a device by ID.
    async fn get(&self, device_id: &str) -> Result<Option<Device>>;

    /// Whether the device is registered and active.
    async fn is_active(&self, device_id: &str) -> Result<bool> {
        Ok(self
            .get(device_id)
            .await?
            .map(|d| d.status == crate::core::DeviceStatus::Active)
            .unwrap_or(false))
    }

    /// Number of active devices.
    async fn active_count(&self) -> Result<u64>;
}
