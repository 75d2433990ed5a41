//! Shared tracing/logging setup.

pub mod tracing;

pub use crate::tracing::{LogFormat, TracingConfig};

/// Initialize process-wide tracing with settings taken from the environment.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(&TracingConfig::from_env());
}
