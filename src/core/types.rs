//! Common types used across FEDAGG modules.

use serde::{Deserialize, Serialize};

/// Unique identifier of an ingested model update.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateId(pub String);

impl UpdateId {
    /// Create an update ID from a string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp wrapper for consistent serialization.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get current UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// A model update submitted by an edge device.
///
/// Append-only: only the `consumed` flag ever changes after ingestion, and
/// records are never deleted (they form the audit trail of every round).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelUpdate {
    /// Unique update ID
    pub id: UpdateId,
    /// Submitting device
    pub device_id: String,
    /// Model this update belongs to
    pub model_name: String,
    /// Flattened weight/gradient vector
    pub update_vector: Vec<f32>,
    /// Number of local training samples behind this update
    pub samples_count: u64,
    /// Ingestion timestamp
    pub created_at: Timestamp,
    /// Set once folded into a completed round
    pub consumed: bool,
}

/// Device status as seen by the aggregation core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Eligible to contribute updates
    Active,
    /// Registered but not contributing
    Inactive,
}

/// An edge device known to the federation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    /// Unique device ID
    pub device_id: String,
    /// Current status
    pub status: DeviceStatus,
    /// Registration timestamp
    pub registered_at: Timestamp,
    /// Last contact timestamp
    pub last_seen: Timestamp,
}

impl Device {
    /// Register a new active device.
    pub fn new(device_id: &str, registered_at: Timestamp) -> Self {
        Self {
            device_id: device_id.to_string(),
            status: DeviceStatus::Active,
            registered_at,
            last_seen: registered_at,
        }
    }
}
