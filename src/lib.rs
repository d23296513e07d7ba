//! aggcache - package reachability and aggregate cache
//!
//! For a directed acyclic graph of packages, aggcache computes every
//! package's reachability closure, gives each package set a canonical
//! [`AggregateId`](aggregate::AggregateId), and expresses multi-package sets
//! as binary combinations of smaller shared sets so derived per-set data can
//! be memoized. Packages are classified as *stable* (frozen content) or
//! *local-dependent* (reaching a locally edited package); the stable part of
//! the cache can be persisted and reused by the next cycle of a live
//! development loop.
//!
//! # Pipeline
//!
//! ```text
//! graph::manifest ─┐
//!                  ▼
//!           graph::PackageGraph      Head/Tail, stable vs local-dependent
//!                  │
//!                  ▼
//!           pool::ReachablePool      interned reachable sets
//!                  │
//!                  ▼
//!   decompose::DecompositionBuilder  binary splits, smallest first
//!                  │
//!                  ▼
//!          cache::AggregateCache     tables, closures, stable identifiers
//!                  │
//!                  ▼
//!           live::LiveStateFile      persisted stable table
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use aggcache::cache::CacheBuilder;
//! use aggcache::graph::{PackageDescriptor, PackageGraph, PackageIndex};
//!
//! let graph = PackageGraph::new(vec![
//!     PackageDescriptor::new("p1"),
//!     PackageDescriptor::local("p2"),
//!     PackageDescriptor::local("p3").with_requires([0, 1]),
//! ]);
//! let mut cache = CacheBuilder::new().build(graph);
//!
//! let p3 = PackageIndex::new(3);
//! assert_eq!(cache.after_reachable(p3).len(), 3);
//!
//! let id = cache.register_aggregate([PackageIndex::new(2), PackageIndex::new(1)]);
//! println!("{id}: {:?}", cache.get_closure(id));
//! ```
//!
//! # Modules
//!
//! - [`graph`] - package graph model and the TOML graph manifest
//! - [`aggregate`] - `AggregateKey` and `AggregateId`
//! - [`pool`] - reachable-set pool
//! - [`decompose`] - decomposition builder
//! - [`cache`] - aggregate tables and the frozen cache
//! - [`live`] - live-state codec and envelope
//! - [`config`] - `aggcache.toml` and environment overrides
//! - [`cli`] - command-line interface

// Core functionality modules
pub mod aggregate;
pub mod cache;
pub mod decompose;
pub mod graph;
pub mod pool;

// Persistence and configuration
pub mod config;
pub mod live;

// Supporting modules
pub mod cli;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
