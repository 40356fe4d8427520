//! Tracing setup for tests.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fctl_harness=debug,fctl_e2e=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
