//! Tempo Controller Library
//!
//! Reconciles `TempoStack` resources into a running multi-component Tempo
//! deployment. The binary in `main.rs` only wires these modules together;
//! everything below is usable and testable on its own.

pub mod certificates;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod manifests;
pub mod observability;
pub mod runtime;
pub mod server;
