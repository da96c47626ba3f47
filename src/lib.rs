//! # FEDAGG - Federated Aggregation Core
//!
//! Coordinates federated learning across a fleet of edge health-monitoring
//! devices:
//! - **Ingestion**: append-only per-device model update records
//! - **Readiness**: windowed distinct-device threshold before a round starts
//! - **Privacy**: per-update Laplace noise, so no aggregation step ever sees
//!   an un-noised individual contribution
//! - **Aggregation**: sample-count-weighted federated averaging per model
//! - **Rounds**: lease-serialized round execution with an auditable history
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fedagg::config::FederationConfig;
//! use fedagg::core::now;
//! use fedagg::round::in_memory_coordinator;
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = in_memory_coordinator(FederationConfig::default()).unwrap();
//!     // A periodic scheduler drives the round loop:
//!     let round = coordinator.check_and_maybe_run(now()).await.unwrap();
//!     println!("round: {:?}", round.map(|r| r.round_number));
//! }
//! ```

pub mod aggregation;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod privacy;
pub mod round;
pub mod store;

pub use crate::core::error::{Error, Result};
pub use config::FederationConfig;
