//! # Validation
//!
//! Validates the object storage secret and parses the duration and quantity
//! strings carried by a TempoStack.

mod duration;
mod quantity;
mod storage;

pub use duration::{format_duration, parse_kubernetes_duration};
pub use quantity::{parse_cpu_millis, parse_memory_bytes};
pub use storage::{
    aggregate_storage_errors, is_valid_url, validate_storage_credentials, StorageCredentials,
    KEY_ACCESS_KEY_ID, KEY_ACCESS_KEY_SECRET, KEY_BUCKET, KEY_ENDPOINT,
};
