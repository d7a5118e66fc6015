//! Process-wide logging setup shared by the binaries.

pub mod tracing;

pub use tracing::{LogConfig, LogFormat};

/// Initialize logging from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(&LogConfig::from_env());
}
