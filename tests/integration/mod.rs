//! Integration test suite for aggcache
//!
//! End-to-end tests over the public library API and the `aggcache` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenario**: manifest loading and the reference graph through the full pipeline
//! - **live_state**: persisting and reloading live state across cycles
//! - **cli**: the `build` and `closure` commands

mod cli;
mod live_state;
mod scenario;

use aggcache::graph::PackageGraph;
use aggcache::graph::manifest::GraphManifest;
use aggcache::test_utils::GraphFixture;

/// Parse a fixture into a graph.
pub fn graph_of(fixture: &GraphFixture) -> PackageGraph {
    GraphManifest::parse(&fixture.content, "fixture.toml").unwrap().to_graph().unwrap()
}
