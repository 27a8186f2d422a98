//! Shared helpers for the `jobcache` integration tests.
//!
//! - [`builders`]: manifest and job-config builders.
//! - [`fake_build`]: counting build callbacks backed by a `MockFileSystem`.

pub mod builders;
pub mod fake_build;

use std::sync::Once;

use jobcache::logging::LOG_ENV;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured per test and only shown for failures (or with
/// `--nocapture`). The filter is read from `JOBCACHE_LOG`, e.g.
/// `JOBCACHE_LOG=jobcache::job=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .with_env_var(LOG_ENV)
            .from_env_lossy();

        // Another subscriber may already be installed by the test binary.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
