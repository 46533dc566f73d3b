//! Test utilities for stackhub
//!
//! Helpers shared by unit tests and the integration suite (enabled through the
//! `test-utils` feature):
//! - once-guarded logging setup
//! - [`StorageFixture`]: a temporary directory plus in-memory object stores wired
//!   into a [`StorageSession`](crate::storage::StorageSession)
//! - sample stack parameters

pub mod fixtures;

pub use fixtures::{StorageFixture, sample_parameters, sample_parameters_yaml};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// With `Some(level)` that level is used; otherwise `RUST_LOG` is honored when
/// set, and logging stays off when it is not. Only the first call has an effect.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
