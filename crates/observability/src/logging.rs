//! Subscriber installation.
//!
//! Library crates only emit `tracing` events; whoever owns the process
//! picks the subscriber here. Filtering follows `RUST_LOG`.

use tracing_subscriber::EnvFilter;

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// JSON logs with timestamps, `info` unless `RUST_LOG` says otherwise.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable logs captured by the test harness, `debug` by default.
///
/// Every test may call it; only the first call installs the subscriber.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_for_tests();
        init_for_tests();
        init();
        tracing::info!(tenant = "test", "still logging");
    }
}
