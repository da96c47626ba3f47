//! Federated model aggregation.

pub mod fedavg;

pub use fedavg::federated_average;
