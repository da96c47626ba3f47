//! Aggregation round orchestration.
//!
//! The readiness gate decides when a round may start; the coordinator
//! runs it end-to-end.

pub mod coordinator;
pub mod readiness;

pub use coordinator::{in_memory_coordinator, RoundCoordinator};
pub use readiness::is_ready;
