//! # Observability
//!
//! Prometheus metrics for the controller. Logs go through `tracing`.

pub mod metrics;

pub use metrics::*;
