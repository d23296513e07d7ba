//! Test utilities for aggcache
//!
//! Shared graph fixtures and logging setup for unit tests and the
//! integration suite (enabled there through the `test-utils` feature).
//!
//! # Example
//!
//! ```rust,no_run
//! use aggcache::test_utils::{init_test_logging, scenario_graph};
//!
//! init_test_logging(None);
//! let graph = scenario_graph();
//! assert_eq!(graph.len(), 5);
//! ```

pub mod fixtures;

pub use fixtures::{GraphFixture, graph_from_masks, scenario_descriptors, scenario_graph};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Respects `RUST_LOG` when set, otherwise uses `level`. With neither, no
/// subscriber is installed.
///
/// ```bash
/// RUST_LOG=aggcache=trace cargo test
/// ```
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
