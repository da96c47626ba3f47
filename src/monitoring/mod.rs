//! Operational monitoring.

pub mod metrics;

pub use metrics::{FederationMetrics, MetricsRecorder};
