//! Optimal decomposition builder.
//!
//! Once the [`ReachablePool`] is complete, every pooled set with three or
//! more members is expressed as a [`DecompositionNode`]: two disjoint,
//! already-known parts whose union is the set. Consumers combine per-part
//! derived data instead of recomputing it for every set, so the more parts
//! are shared between sets the less work they do.
//!
//! Finding the decomposition forest with maximal sharing is a hard
//! combinatorial problem. The builder uses a greedy heuristic instead and
//! processes sets in ascending cardinality, so every part it references is a
//! smaller set that is already registered:
//!
//! 1. Sets are searched in ascending index order. Members closer to the Tail
//!    sit at the end of the sequence and are probed first by the suffix
//!    search.
//! 2. The longest known suffix becomes `part2`.
//! 3. The longest known prefix of the remainder becomes `part1`.
//! 4. If prefix and suffix cover the set, done.
//! 5. Otherwise the uncovered middle (the hole) is found or created
//!    recursively, a new node `hole ∪ part2` is synthesized and registered,
//!    and the result is `(part1, node)`.
//!
//! Hybrid sets are always split into a purely stable `part1` and a purely
//! local-dependent `part2`, since the two halves are invalidated at
//! different times. When only one member is of the minority kind it is
//! paired directly with the majority.
//!
//! Example: with `{1,2}` and `{1,2,3,4}` known, `{1,2,3,4,5}` becomes
//! `{1,2,3,4} + {5}`; the smaller set itself was split as `{1,2} + {3,4}`,
//! where `{3,4}` was synthesized to fill the hole.

use std::collections::BTreeMap;

use crate::graph::PackageIndex;
use crate::pool::{DecompositionNode, ReachablePool, SetHandle, SetOrigin, SetRef};

#[cfg(test)]
mod decompose_tests;

/// Counters reported by [`DecompositionBuilder::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompositionStats {
    /// Discovered sets decomposed in this pass.
    pub decomposed: usize,
    /// Intermediate sets synthesized and registered.
    pub synthesized: usize,
    /// Hybrid sets split into stable and local halves.
    pub hybrid_splits: usize,
    /// Splits that had to fill a hole between prefix and suffix.
    pub gap_fills: usize,
}

/// Second pass over the pool, see the module documentation.
pub struct DecompositionBuilder<'a> {
    pool: &'a mut ReachablePool,
    stats: DecompositionStats,
}

impl<'a> DecompositionBuilder<'a> {
    /// Wrap a fully discovered pool.
    pub fn new(pool: &'a mut ReachablePool) -> Self {
        Self {
            pool,
            stats: DecompositionStats::default(),
        }
    }

    /// Decompose every pending discovered set, smallest first.
    pub fn run(mut self) -> DecompositionStats {
        let mut pending: BTreeMap<usize, Vec<SetHandle>> = BTreeMap::new();
        for (handle, set) in self.pool.iter() {
            if set.origin() == SetOrigin::Discovered && set.decomposition().is_none() {
                pending.entry(set.len()).or_default().push(handle);
            }
        }

        for (cardinality, handles) in pending {
            tracing::trace!("Decomposing {} sets of {} members", handles.len(), cardinality);
            for handle in handles {
                let members = self.pool.get(handle).members().to_vec();
                let node = self.decompose(&members);
                self.debug_check_partition(&members, &node);
                self.pool.set_decomposition(handle, node);
                self.stats.decomposed += 1;
            }
        }

        tracing::debug!(
            "Decomposed {} sets ({} synthesized, {} hybrid, {} gap fills)",
            self.stats.decomposed,
            self.stats.synthesized,
            self.stats.hybrid_splits,
            self.stats.gap_fills
        );
        self.stats
    }

    /// Split a sorted member list of two or more packages.
    fn decompose(&mut self, members: &[PackageIndex]) -> DecompositionNode {
        debug_assert!(members.len() >= 2);

        let (stable, local): (Vec<PackageIndex>, Vec<PackageIndex>) =
            members.iter().partition(|p| !self.pool.is_local_dependent(**p));

        if stable.is_empty() || local.is_empty() {
            return self.decompose_homogeneous(members);
        }

        self.stats.hybrid_splits += 1;
        if stable.len() == 1 {
            let majority = self.find_or_create(&local);
            DecompositionNode::new(SetRef::Single(stable[0]), majority)
        } else if local.len() == 1 {
            let majority = self.find_or_create(&stable);
            DecompositionNode::new(majority, SetRef::Single(local[0]))
        } else {
            let part1 = self.find_or_create(&stable);
            let part2 = self.find_or_create(&local);
            DecompositionNode::new(part1, part2)
        }
    }

    fn decompose_homogeneous(&mut self, seq: &[PackageIndex]) -> DecompositionNode {
        let n = seq.len();

        // A length-1 suffix is always known
        let (part2, suffix_len) = (1..n)
            .rev()
            .find_map(|len| self.pool.lookup(&seq[n - len..]).map(|set| (set, len)))
            .unwrap_or((SetRef::Single(seq[n - 1]), 1));

        let remainder = n - suffix_len;
        let (part1, prefix_len) = (1..=remainder)
            .rev()
            .find_map(|len| self.pool.lookup(&seq[..len]).map(|set| (set, len)))
            .unwrap_or((SetRef::Single(seq[0]), 1));

        if prefix_len + suffix_len == n {
            return DecompositionNode::new(part1, part2);
        }

        self.stats.gap_fills += 1;
        let hole = self.find_or_create(&seq[prefix_len..n - suffix_len]);
        let rest = seq[prefix_len..].to_vec();
        tracing::trace!(
            "Filling hole of {} members between prefix {} and suffix {}",
            n - prefix_len - suffix_len,
            prefix_len,
            suffix_len
        );
        let handle = self.pool.insert_synthesized(rest, DecompositionNode::new(hole, part2));
        self.stats.synthesized += 1;
        DecompositionNode::new(part1, SetRef::Pooled(handle))
    }

    /// Known set with exactly `members`, creating it if needed.
    fn find_or_create(&mut self, members: &[PackageIndex]) -> SetRef {
        if let Some(set) = self.pool.lookup(members) {
            return set;
        }

        let node = self.decompose(members);
        self.debug_check_partition(members, &node);
        let handle = self.pool.insert_synthesized(members.to_vec(), node);
        self.stats.synthesized += 1;
        SetRef::Pooled(handle)
    }

    fn debug_check_partition(&self, members: &[PackageIndex], node: &DecompositionNode) {
        if cfg!(debug_assertions) {
            let mut union: Vec<PackageIndex> = self.pool.members(node.part1).to_vec();
            union.extend_from_slice(self.pool.members(node.part2));
            let total = union.len();
            union.sort_unstable();
            union.dedup();
            debug_assert_eq!(total, union.len(), "decomposition parts overlap");
            debug_assert_eq!(union.as_slice(), members, "decomposition does not cover the set");
        }
    }
}

/// Run the decomposition pass over `pool`.
pub fn decompose_pool(pool: &mut ReachablePool) -> DecompositionStats {
    DecompositionBuilder::new(pool).run()
}
