//! Storage collaborators of the aggregation core.
//!
//! Trait-based seams for the three external stores:
//! - append-only model-update records
//! - active-device registry
//! - round records with the in-progress lease
//!
//! In-memory reference implementations live in [`memory`].

pub mod device;
pub mod memory;
pub mod round;
pub mod update;

pub use device::DeviceRegistry;
pub use memory::{MemoryDeviceRegistry, MemoryRoundStore, MemoryUpdateStore};
pub use round::{AggregationRound, RoundStatus, RoundStore};
pub use update::UpdateStore;
