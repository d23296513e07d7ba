//! Full construction pipeline: graph, pool, decomposition, tables.

use dashmap::DashMap;
use std::collections::BTreeSet;

use super::{AggregateCache, AggregateTables, PackageAggregates};
use crate::aggregate::IdComponent;
use crate::decompose::decompose_pool;
use crate::graph::PackageGraph;
use crate::live::LiveState;
use crate::pool::ReachablePool;

/// Builds an [`AggregateCache`].
///
/// ```rust,no_run
/// use aggcache::cache::CacheBuilder;
/// use aggcache::test_utils::scenario_graph;
///
/// let cache = CacheBuilder::new().live(true).build(scenario_graph());
/// let state = cache.live_state();
///
/// // next cycle: keep the stable handles of the previous one
/// let next = CacheBuilder::new().with_live_state(state).build(scenario_graph());
/// assert_eq!(next.stats().seeded_stable_aggregates, cache.stats().stable_aggregates);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
    live: bool,
    seed: Option<LiveState>,
}

impl CacheBuilder {
    /// A builder for a plain, non-live build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable live mode.
    ///
    /// Live mode additionally records the stable identifiers needed by the
    /// next reload cycle.
    #[must_use]
    pub const fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Seed the stable table from the previous cycle. Implies live mode.
    ///
    /// Every persisted stable entry is kept, in order, whether or not the
    /// current graph still registers it. Entries that only earlier versions
    /// of local packages referenced stay in the table, so over a live session
    /// the stable table only grows. Start a cycle without a seed to compact it.
    #[must_use]
    pub fn with_live_state(mut self, state: LiveState) -> Self {
        self.live = true;
        self.seed = Some(state);
        self
    }

    /// Run the pipeline over `graph`.
    ///
    /// An invalid seed is logged and ignored; the build then proceeds from
    /// empty tables.
    #[must_use]
    pub fn build(self, graph: PackageGraph) -> AggregateCache {
        let mut tables = AggregateTables::default();
        let mut seeded = 0;
        if let Some(state) = &self.seed {
            match tables.seed_stable(&graph, &state.stable_aggregates) {
                Ok(count) => {
                    seeded = count;
                    tracing::debug!("Seeded {} stable aggregates from live state", count);
                }
                Err(e) => {
                    tracing::warn!("Discarding live state, rebuilding from scratch: {e}");
                }
            }
        }

        let mut pool = ReachablePool::build(&graph);
        let decomposition = decompose_pool(&mut pool);

        let mut packages = Vec::with_capacity(graph.len());
        for package in graph.packages() {
            let after = pool.members(pool.reach(package.index()).after_reachable);
            packages.push(PackageAggregates {
                requires: tables.register(&graph, package.requires().iter().copied()),
                children: tables.register(&graph, package.children().iter().copied()),
                after: tables.register(&graph, after.iter().copied()),
            });
        }

        let mut stable_identifiers = BTreeSet::new();
        if self.live {
            for (package, aggregates) in graph.packages().iter().zip(&packages) {
                if !package.is_eventually_local_dependent() {
                    continue;
                }
                for id in [aggregates.requires, aggregates.children] {
                    if let IdComponent::Aggregate(handle) = id.stable {
                        stable_identifiers.insert(handle);
                    }
                }
            }
        }

        let cache = AggregateCache {
            graph,
            pool,
            tables,
            packages,
            stable_identifiers,
            closures: DashMap::new(),
            live: self.live,
            decomposition,
            seeded,
        };

        let stats = cache.stats();
        tracing::info!(
            "Built aggregate cache: {} packages, {} stable and {} local aggregates{}",
            stats.packages,
            stats.stable_aggregates,
            stats.local_aggregates,
            if cache.live { format!(", {} stable identifiers", stats.stable_identifiers) } else { String::new() }
        );
        cache
    }
}
