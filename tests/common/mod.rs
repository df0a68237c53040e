//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod flaky_store;

/// Installs a test-writer tracing subscriber once per test binary.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lease_lock=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
