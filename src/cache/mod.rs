//! Aggregate cache tables.
//!
//! [`AggregateCache`] is the frozen result of one graph construction: the
//! [`ReachablePool`] with its decompositions, the stable and local
//! [`AggregateTables`], the per-package aggregate identities and a closure
//! memo. It is built once by [`CacheBuilder`] and then shared read-only.
//!
//! # Reading the cache
//!
//! ```rust,no_run
//! use aggcache::cache::CacheBuilder;
//! use aggcache::graph::{PackageDescriptor, PackageGraph, PackageIndex};
//!
//! let graph = PackageGraph::new(vec![
//!     PackageDescriptor::new("p1"),
//!     PackageDescriptor::local("p2"),
//! ]);
//! let mut cache = CacheBuilder::new().build(graph);
//!
//! let id = cache.register_aggregate([PackageIndex::new(1), PackageIndex::new(2)]);
//! let closure = cache.get_closure(id);
//! assert_eq!(closure.len(), 3);
//! ```
//!
//! # Concurrency
//!
//! Every read takes `&self`. The closure memo is a [`DashMap`], so a shared
//! `&AggregateCache` (or an `Arc` of it) can serve closures to many threads;
//! concurrent requests for the same identity all receive the same `Arc`.

mod builder;
mod table;


pub use builder::CacheBuilder;
pub use table::{AggregateTable, AggregateTables};

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::aggregate::{AggregateId, IdComponent, LocalHandle, StableHandle};
use crate::decompose::DecompositionStats;
use crate::graph::{PackageGraph, PackageIndex};
use crate::live::LiveState;
use crate::pool::{ReachablePool, SetRef};

/// Aggregate identities of one package's edge sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackageAggregates {
    /// Identity of the direct `requires`.
    pub requires: AggregateId,
    /// Identity of the direct `children`.
    pub children: AggregateId,
    /// Identity of everything reachable from the package, excluding itself.
    pub after: AggregateId,
}

/// Summary of a built cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Packages including Head and Tail.
    pub packages: usize,
    /// Local-dependent packages.
    pub local_dependent_packages: usize,
    /// Sets in the stable pool.
    pub stable_sets: usize,
    /// Sets in the local-dependent pool.
    pub local_sets: usize,
    /// Intermediate sets created by the decomposition pass.
    pub synthesized_sets: usize,
    /// Hybrid sets split into stable and local halves.
    pub hybrid_splits: usize,
    /// Entries of the stable table.
    pub stable_aggregates: usize,
    /// Entries of the local table.
    pub local_aggregates: usize,
    /// Stable entries preloaded from a live state.
    pub seeded_stable_aggregates: usize,
    /// Stable handles referenced from local-dependent packages.
    pub stable_identifiers: usize,
}

/// Frozen reachability and aggregate cache for one graph.
#[derive(Debug)]
pub struct AggregateCache {
    graph: PackageGraph,
    pool: ReachablePool,
    tables: AggregateTables,
    packages: Vec<PackageAggregates>,
    stable_identifiers: BTreeSet<StableHandle>,
    closures: DashMap<AggregateId, Arc<[PackageIndex]>>,
    live: bool,
    decomposition: DecompositionStats,
    seeded: usize,
}

impl AggregateCache {
    /// Identity of `members`, adding table entries for unknown aggregates.
    ///
    /// Idempotent: set-equal inputs in any order, with or without
    /// duplicates, return the same identity. Registering never changes the
    /// identity of anything registered before, so memoized closures stay
    /// valid.
    pub fn register_aggregate(
        &mut self,
        members: impl IntoIterator<Item = PackageIndex>,
    ) -> AggregateId {
        self.tables.register(&self.graph, members)
    }

    /// Identity of `members` if every needed table entry already exists.
    #[must_use]
    pub fn lookup_aggregate(
        &self,
        members: impl IntoIterator<Item = PackageIndex>,
    ) -> Option<AggregateId> {
        self.tables.lookup(&self.graph, members)
    }

    /// Members of a stable aggregate. Panics on a handle from another cache.
    #[must_use]
    pub fn get_stable_aggregate(&self, handle: StableHandle) -> &[PackageIndex] {
        self.tables
            .stable
            .get(handle)
            .unwrap_or_else(|| panic!("stable handle {handle} is not registered"))
    }

    /// Members of a local aggregate. Panics on a handle from another cache.
    #[must_use]
    pub fn get_local_aggregate(&self, handle: LocalHandle) -> &[PackageIndex] {
        self.tables
            .local
            .get(handle)
            .unwrap_or_else(|| panic!("local handle {handle} is not registered"))
    }

    /// Members of the stable component of `id`.
    #[must_use]
    pub fn stable_members(&self, id: &AggregateId) -> &[PackageIndex] {
        match &id.stable {
            IdComponent::Absent => &[],
            IdComponent::Single(index) => self.pool.members(SetRef::Single(*index)),
            IdComponent::Aggregate(handle) => self.get_stable_aggregate(*handle),
        }
    }

    /// Members of the local component of `id`.
    #[must_use]
    pub fn local_members(&self, id: &AggregateId) -> &[PackageIndex] {
        match &id.local {
            IdComponent::Absent => &[],
            IdComponent::Single(index) => self.pool.members(SetRef::Single(*index)),
            IdComponent::Aggregate(handle) => self.get_local_aggregate(*handle),
        }
    }

    /// All members of `id`, ascending.
    #[must_use]
    pub fn members(&self, id: &AggregateId) -> Vec<PackageIndex> {
        let mut members = [self.stable_members(id), self.local_members(id)].concat();
        members.sort_unstable();
        members
    }

    /// Union of `reachable(p)` over every member of `id`, ascending.
    ///
    /// Memoized per identity: repeated calls return the same `Arc`.
    pub fn get_closure(&self, id: AggregateId) -> Arc<[PackageIndex]> {
        if let Some(closure) = self.closures.get(&id) {
            return Arc::clone(closure.value());
        }

        let mut closure: Vec<PackageIndex> = Vec::new();
        for member in [self.stable_members(&id), self.local_members(&id)].concat() {
            closure.extend_from_slice(self.pool.members(self.pool.reach(member).reachable));
        }
        closure.sort_unstable();
        closure.dedup();

        // another reader may have won the race; keep its instance
        Arc::clone(self.closures.entry(id).or_insert_with(|| closure.into()).value())
    }

    /// Register `members` and return their closure.
    pub fn closure_of(
        &mut self,
        members: impl IntoIterator<Item = PackageIndex>,
    ) -> Arc<[PackageIndex]> {
        let id = self.register_aggregate(members);
        self.get_closure(id)
    }

    /// Everything transitively required by or nested under `index`, ascending.
    #[must_use]
    pub fn after_reachable(&self, index: PackageIndex) -> &[PackageIndex] {
        self.pool.members(self.pool.reach(index).after_reachable)
    }

    /// [`AggregateCache::after_reachable`] plus `index` itself.
    #[must_use]
    pub fn reachable(&self, index: PackageIndex) -> &[PackageIndex] {
        self.pool.members(self.pool.reach(index).reachable)
    }

    /// Aggregate identities of the edges of `index`.
    #[must_use]
    pub fn package_aggregates(&self, index: PackageIndex) -> &PackageAggregates {
        &self.packages[index.as_usize()]
    }

    /// Stable handles referenced from local-dependent packages, ascending.
    ///
    /// Empty unless the cache was built in live mode.
    #[must_use]
    pub const fn stable_identifiers(&self) -> &BTreeSet<StableHandle> {
        &self.stable_identifiers
    }

    /// The graph the cache was built from.
    #[must_use]
    pub const fn graph(&self) -> &PackageGraph {
        &self.graph
    }

    /// The decomposed reachable-set pool.
    #[must_use]
    pub const fn pool(&self) -> &ReachablePool {
        &self.pool
    }

    /// The stable and local tables.
    #[must_use]
    pub const fn tables(&self) -> &AggregateTables {
        &self.tables
    }

    /// Whether the cache was built in live mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.live
    }

    /// Counters describing the cache.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            packages: self.graph.len(),
            local_dependent_packages: self
                .graph
                .packages()
                .iter()
                .filter(|p| p.is_eventually_local_dependent())
                .count(),
            stable_sets: self.pool.stable_sets().len(),
            local_sets: self.pool.local_sets().len(),
            synthesized_sets: self.decomposition.synthesized,
            hybrid_splits: self.decomposition.hybrid_splits,
            stable_aggregates: self.tables.stable.len(),
            local_aggregates: self.tables.local.len(),
            seeded_stable_aggregates: self.seeded,
            stable_identifiers: self.stable_identifiers.len(),
        }
    }

    /// Flat form of the tables for persistence.
    #[must_use]
    pub fn live_state(&self) -> LiveState {
        fn raw(members: &[PackageIndex]) -> Vec<i32> {
            members.iter().map(|p| p.as_u32() as i32).collect()
        }

        LiveState {
            stable_aggregates: self.tables.stable.iter().map(|(_, m)| raw(m)).collect(),
            local_aggregates: self.tables.local.iter().map(|(_, m)| raw(m)).collect(),
            stable_identifiers: self.stable_identifiers.iter().map(|h| h.as_u32() as i32).collect(),
        }
    }
}
