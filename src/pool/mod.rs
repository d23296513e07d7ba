//! Reachable-set pool.
//!
//! The pool walks the graph once in index order and interns, for every
//! package `p`:
//!
//! - `after(p)`: the union of the reachable sets of everything `p` requires
//!   or contains, and
//! - `reachable(p) = after(p) ∪ {p}`.
//!
//! Interning is content-addressed through [`AggregateKey`]: two raw sets with
//! the same members resolve to the same arena slot, hence the same
//! [`ReachableSet`] instance. The empty set and singletons are never
//! interned; they are represented by [`SetRef::Empty`] and
//! [`SetRef::Single`], the latter aliasing the package itself. Pairs are
//! bound to their two singletons as soon as they are interned, since a pair
//! already is an optimal binary split.
//!
//! Sets whose members are all stable go to the stable pool, sets with at
//! least one local-dependent member go to the local-dependent pool. The
//! decomposition of sets with three or more members is deferred to
//! [`crate::decompose`].

use rustc_hash::FxHashMap;
use std::fmt;

use crate::aggregate::AggregateKey;
use crate::graph::{PackageGraph, PackageIndex};


/// Position of a set in the pool arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetHandle(u32);

impl SetHandle {
    /// The raw arena position.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set{}", self.0)
    }
}

/// Reference to a package set known to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetRef {
    /// The empty set.
    Empty,
    /// A singleton, aliasing the package itself.
    Single(PackageIndex),
    /// An interned set of two or more members.
    Pooled(SetHandle),
}

impl fmt::Display for SetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "∅"),
            Self::Single(index) => write!(f, "{index}"),
            Self::Pooled(handle) => write!(f, "{handle}"),
        }
    }
}

/// Which pool a set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKind {
    /// Every member is stable.
    Stable,
    /// At least one member is local-dependent.
    LocalDependent,
}

/// How a set entered the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOrigin {
    /// Found while walking the graph.
    Discovered,
    /// Created by the decomposition builder as an intermediate part.
    Synthesized,
}

/// Binary split of a set into two disjoint parts whose union is the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompositionNode {
    /// First part.
    pub part1: SetRef,
    /// Second part.
    pub part2: SetRef,
}

impl DecompositionNode {
    /// Pair two parts.
    #[must_use]
    pub const fn new(part1: SetRef, part2: SetRef) -> Self {
        Self {
            part1,
            part2,
        }
    }
}

/// An interned package set.
#[derive(Debug, Clone)]
pub struct ReachableSet {
    key: AggregateKey,
    kind: SetKind,
    hybrid: bool,
    origin: SetOrigin,
    decomposition: Option<DecompositionNode>,
}

impl ReachableSet {
    /// Members in ascending index order.
    #[must_use]
    pub fn members(&self) -> &[PackageIndex] {
        self.key.indices()
    }

    /// Canonical key of the set.
    #[must_use]
    pub const fn key(&self) -> &AggregateKey {
        &self.key
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Always false: only sets of two or more members are interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Stable or local-dependent pool.
    #[must_use]
    pub const fn kind(&self) -> SetKind {
        self.kind
    }

    /// Whether the set mixes stable and local-dependent members.
    #[must_use]
    pub const fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    /// Discovered while walking or synthesized during decomposition.
    #[must_use]
    pub const fn origin(&self) -> SetOrigin {
        self.origin
    }

    /// The binary split, once known.
    #[must_use]
    pub const fn decomposition(&self) -> Option<&DecompositionNode> {
        self.decomposition.as_ref()
    }
}

/// Reachability of one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageReach {
    /// `{p} ∪ after(p)`.
    pub reachable: SetRef,
    /// Everything transitively required by or nested under `p`, excluding `p`.
    pub after_reachable: SetRef,
}

/// Arena of interned sets plus the key lookup.
#[derive(Debug, Clone)]
pub struct ReachablePool {
    sets: Vec<ReachableSet>,
    lookup: FxHashMap<AggregateKey, SetHandle>,
    stable: Vec<SetHandle>,
    local: Vec<SetHandle>,
    /// Copy of the graph classification, indexed by package.
    local_dependent: Vec<bool>,
    /// `singletons[i] == PackageIndex(i)`, backing single-member slices.
    singletons: Vec<PackageIndex>,
    reach: Vec<PackageReach>,
}

impl ReachablePool {
    /// Create an empty pool for the packages of `graph`.
    #[must_use]
    pub fn new(graph: &PackageGraph) -> Self {
        Self {
            sets: Vec::new(),
            lookup: FxHashMap::default(),
            stable: Vec::new(),
            local: Vec::new(),
            local_dependent: graph
                .packages()
                .iter()
                .map(|p| p.is_eventually_local_dependent())
                .collect(),
            singletons: (0..graph.len() as u32).map(PackageIndex::new).collect(),
            reach: Vec::with_capacity(graph.len()),
        }
    }

    /// Create a pool and walk the whole graph.
    #[must_use]
    pub fn build(graph: &PackageGraph) -> Self {
        let mut pool = Self::new(graph);
        pool.discover(graph);
        pool
    }

    /// Intern `after(p)` and `reachable(p)` for every package, in index order.
    ///
    /// Relies on topological order: the reachable sets of every requirement
    /// and child are already pooled when a package is visited.
    pub fn discover(&mut self, graph: &PackageGraph) {
        debug_assert!(self.reach.is_empty(), "discover must run once");

        let mut members: Vec<PackageIndex> = Vec::new();
        for package in graph.packages() {
            members.clear();
            for edge in package.edges() {
                debug_assert!(edge < package.index(), "edge {edge} of {package} is not earlier");
                let reachable = self.reach[edge.as_usize()].reachable;
                members.extend_from_slice(self.members(reachable));
            }
            members.sort_unstable();
            members.dedup();

            let after_reachable = self.intern(members.clone());
            // package index is the maximum, so pushing keeps the order
            members.push(package.index());
            let reachable = self.intern(members.clone());

            self.reach.push(PackageReach {
                reachable,
                after_reachable,
            });
        }

        tracing::debug!(
            "Pooled {} stable and {} local-dependent reachable sets for {} packages",
            self.stable.len(),
            self.local.len(),
            self.reach.len()
        );
    }

    /// Intern a sorted, duplicate-free member list.
    ///
    /// Returns the existing handle when the same set was interned before.
    pub fn intern(&mut self, members: Vec<PackageIndex>) -> SetRef {
        match members.len() {
            0 => return SetRef::Empty,
            1 => return SetRef::Single(members[0]),
            _ => {}
        }

        let key = AggregateKey::from_sorted(members);
        if let Some(&handle) = self.lookup.get(&key) {
            return SetRef::Pooled(handle);
        }

        let decomposition = (key.len() == 2).then(|| self.pair_node(key.indices()));
        SetRef::Pooled(self.insert(key, SetOrigin::Discovered, decomposition))
    }

    /// Register an intermediate set created during decomposition.
    pub(crate) fn insert_synthesized(
        &mut self,
        members: Vec<PackageIndex>,
        node: DecompositionNode,
    ) -> SetHandle {
        let key = AggregateKey::from_sorted(members);
        debug_assert!(!self.lookup.contains_key(&key), "synthesized set {key} already pooled");
        self.insert(key, SetOrigin::Synthesized, Some(node))
    }

    pub(crate) fn set_decomposition(&mut self, handle: SetHandle, node: DecompositionNode) {
        self.sets[handle.as_usize()].decomposition = Some(node);
    }

    fn insert(
        &mut self,
        key: AggregateKey,
        origin: SetOrigin,
        decomposition: Option<DecompositionNode>,
    ) -> SetHandle {
        let local_count = key.indices().iter().filter(|p| self.is_local_dependent(**p)).count();
        let kind = if local_count == 0 {
            SetKind::Stable
        } else {
            SetKind::LocalDependent
        };
        let hybrid = local_count > 0 && local_count < key.len();

        let handle = SetHandle(self.sets.len() as u32);
        match kind {
            SetKind::Stable => self.stable.push(handle),
            SetKind::LocalDependent => self.local.push(handle),
        }
        self.lookup.insert(key.clone(), handle);
        self.sets.push(ReachableSet {
            key,
            kind,
            hybrid,
            origin,
            decomposition,
        });
        handle
    }

    /// Split of a pair: the stable member first for hybrids, otherwise index order.
    fn pair_node(&self, pair: &[PackageIndex]) -> DecompositionNode {
        let (a, b) = (pair[0], pair[1]);
        if self.is_local_dependent(a) && !self.is_local_dependent(b) {
            DecompositionNode::new(SetRef::Single(b), SetRef::Single(a))
        } else {
            DecompositionNode::new(SetRef::Single(a), SetRef::Single(b))
        }
    }

    /// Look up a sorted member list without interning it.
    #[must_use]
    pub fn lookup(&self, members: &[PackageIndex]) -> Option<SetRef> {
        match members.len() {
            0 => Some(SetRef::Empty),
            1 => Some(SetRef::Single(members[0])),
            _ => self
                .lookup
                .get(&AggregateKey::from_sorted(members.to_vec()))
                .map(|&handle| SetRef::Pooled(handle)),
        }
    }

    /// The interned set behind `handle`.
    #[must_use]
    pub fn get(&self, handle: SetHandle) -> &ReachableSet {
        &self.sets[handle.as_usize()]
    }

    /// Members of any set reference, ascending.
    #[must_use]
    pub fn members(&self, set: SetRef) -> &[PackageIndex] {
        match set {
            SetRef::Empty => &[],
            SetRef::Single(index) => {
                let i = index.as_usize();
                &self.singletons[i..=i]
            }
            SetRef::Pooled(handle) => self.sets[handle.as_usize()].members(),
        }
    }

    /// Whether `index` is local-dependent.
    #[must_use]
    pub fn is_local_dependent(&self, index: PackageIndex) -> bool {
        self.local_dependent[index.as_usize()]
    }

    /// The binary split of a pooled set, if decomposed.
    #[must_use]
    pub fn decomposition(&self, handle: SetHandle) -> Option<&DecompositionNode> {
        self.sets[handle.as_usize()].decomposition.as_ref()
    }

    /// Reachability of `index`, available after [`ReachablePool::discover`].
    #[must_use]
    pub fn reach(&self, index: PackageIndex) -> PackageReach {
        self.reach[index.as_usize()]
    }

    /// Every interned set, with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (SetHandle, &ReachableSet)> {
        self.sets.iter().enumerate().map(|(i, set)| (SetHandle(i as u32), set))
    }

    /// Handles of the stable pool in registration order.
    #[must_use]
    pub fn stable_sets(&self) -> &[SetHandle] {
        &self.stable
    }

    /// Handles of the local-dependent pool in registration order.
    #[must_use]
    pub fn local_sets(&self) -> &[SetHandle] {
        &self.local
    }

    /// Total number of interned sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
