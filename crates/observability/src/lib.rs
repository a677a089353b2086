//! Tracing/logging setup shared by binaries and tests.

/// Subscriber configuration and installation.
pub mod tracing;

pub use crate::tracing::ObservabilityConfig;

/// Initialize process-wide logging with the default layout (JSON, `info`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&ObservabilityConfig::default());
}

/// Initialize process-wide logging from explicit settings.
pub fn init_with(config: &ObservabilityConfig) {
    tracing::init(config);
}
