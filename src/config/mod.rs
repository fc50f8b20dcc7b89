//! # Configuration
//!
//! Controller-level settings and feature gates, loaded from environment variables.

mod controller;
mod feature_gates;

pub use controller::ControllerConfig;
pub use feature_gates::{BuiltInCertManagement, FeatureGates, TlsProfile};
