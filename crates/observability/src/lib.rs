//! Tracing and logging setup shared by warden binaries and tests.

/// Subscriber installation.
pub mod logging;

pub use logging::{init, init_for_tests};
