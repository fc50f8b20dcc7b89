//! # Controller
//!
//! Core controller modules for the Tempo controller.
//!
//! - `backoff`: Fibonacci backoff for error retries
//! - `reconciler`: reconcile pass, validation and status
//! - `store`: cluster access behind a trait

pub mod backoff;
pub mod reconciler;
pub mod store;
