//! # Custom Resource Definitions
//!
//! CRD types for the Tempo controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - TempoStack specification and default values
//! - `status.rs` - Status and condition types

mod spec;
mod status;

pub use spec::{
    default_log_level, default_replication_factor, default_storage_size, ImagesSpec,
    IngestionLimitSpec, LimitSpec, ObjectStorageSecretSpec, ObjectStorageSpec, QueryLimitSpec,
    RateLimitSpec, ReceiversTlsSpec, ResourceEnvelope, Resources, RetentionConfig, RetentionSpec,
    StorageBackendType, TempoComponentSpec, TempoDistributorSpec, TempoGatewaySpec, TempoStack,
    TempoStackSpec, TempoTemplateSpec, Toleration,
};
pub use status::{condition_types, reasons, Condition, ConditionStatus, TempoStackStatus};
