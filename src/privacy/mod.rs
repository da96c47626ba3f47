//! Differential privacy for model updates.
//!
//! Per-record Laplace noise, applied before any aggregation.

pub mod noise;

pub use noise::NoiseInjector;
