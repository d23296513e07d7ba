//! Tests for the decomposition heuristic.

use proptest::prelude::*;

use super::*;
use crate::graph::{PackageDescriptor, PackageGraph};
use crate::pool::SetKind;
use crate::test_utils::{graph_from_masks, scenario_graph};

fn indices(raw: &[u32]) -> Vec<PackageIndex> {
    raw.iter().copied().map(PackageIndex::new).collect()
}

/// `count` independent stable packages at indices 1..=count.
fn flat_graph(count: usize) -> PackageGraph {
    PackageGraph::new((0..count).map(|i| PackageDescriptor::new(format!("p{i}"))).collect())
}

/// Same shape as [`flat_graph`], with the packages at `local` marked local.
fn flat_graph_with_local(count: usize, local: &[usize]) -> PackageGraph {
    PackageGraph::new(
        (0..count)
            .map(|i| {
                if local.contains(&(i + 1)) {
                    PackageDescriptor::local(format!("p{i}"))
                } else {
                    PackageDescriptor::new(format!("p{i}"))
                }
            })
            .collect(),
    )
}

fn node_of(pool: &ReachablePool, set: SetRef) -> DecompositionNode {
    let SetRef::Pooled(handle) = set else {
        panic!("{set} is not pooled");
    };
    *pool.decomposition(handle).expect("set should be decomposed")
}

fn assert_exact_partition(pool: &ReachablePool, handle: SetHandle) {
    let set = pool.get(handle);
    let node = set.decomposition().expect("every pooled set is decomposed");
    let part1 = pool.members(node.part1);
    let part2 = pool.members(node.part2);

    assert!(!part1.is_empty() && !part2.is_empty(), "empty part in {}", set.key());
    assert!(part1.iter().all(|p| !part2.contains(p)), "parts of {} overlap", set.key());

    let mut union = [part1, part2].concat();
    union.sort_unstable();
    assert_eq!(union.as_slice(), set.members(), "parts of {} do not cover it", set.key());
}

fn assert_homogeneous_halves(pool: &ReachablePool, handle: SetHandle) {
    let set = pool.get(handle);
    if !set.is_hybrid() {
        return;
    }
    let node = set.decomposition().unwrap();
    let stable = pool.members(node.part1);
    let local = pool.members(node.part2);
    assert!(stable.iter().all(|p| !pool.is_local_dependent(*p)), "part1 of {} not stable", set.key());
    assert!(local.iter().all(|p| pool.is_local_dependent(*p)), "part2 of {} not local", set.key());
}

#[test]
fn test_retrospective_decomposition_prefers_larger_known_prefix() {
    let graph = flat_graph(5);
    let mut pool = ReachablePool::new(&graph);

    // Discovery order: {1,2}, {1,2,3,4,5}, {1,2,3,4}
    let pair = pool.intern(indices(&[1, 2]));
    let large = pool.intern(indices(&[1, 2, 3, 4, 5]));
    let medium = pool.intern(indices(&[1, 2, 3, 4]));

    let stats = decompose_pool(&mut pool);
    assert_eq!(stats.decomposed, 2);

    let large_node = node_of(&pool, large);
    assert_eq!(large_node.part1, medium);
    assert_eq!(large_node.part2, SetRef::Single(PackageIndex::new(5)));

    let medium_node = node_of(&pool, medium);
    assert_eq!(medium_node.part1, pair);
    assert_eq!(pool.members(medium_node.part2), indices(&[3, 4]).as_slice());
}

#[test]
fn test_gap_is_filled_with_synthesized_node() {
    let graph = flat_graph(5);
    let mut pool = ReachablePool::new(&graph);

    let head = pool.intern(indices(&[1, 2]));
    let target = pool.intern(indices(&[1, 2, 3, 4, 5]));

    let stats = decompose_pool(&mut pool);
    assert_eq!(stats.gap_fills, 1);

    // suffix {5}, prefix {1,2}, hole {3,4}
    let node = node_of(&pool, target);
    assert_eq!(node.part1, head);
    assert_eq!(pool.members(node.part2), indices(&[3, 4, 5]).as_slice());

    let SetRef::Pooled(rest) = node.part2 else {
        panic!("rest should be pooled");
    };
    assert_eq!(pool.get(rest).origin(), SetOrigin::Synthesized);
    let rest_node = node_of(&pool, node.part2);
    assert_eq!(pool.members(rest_node.part1), indices(&[3, 4]).as_slice());
    assert_eq!(rest_node.part2, SetRef::Single(PackageIndex::new(5)));

    // the hole is registered for later sets
    assert!(pool.lookup(&indices(&[3, 4])).is_some());
}

#[test]
fn test_longest_known_suffix_wins() {
    let graph = flat_graph(5);
    let mut pool = ReachablePool::new(&graph);

    let suffix = pool.intern(indices(&[3, 4, 5]));
    let short = pool.intern(indices(&[4, 5]));
    let target = pool.intern(indices(&[1, 2, 3, 4, 5]));
    decompose_pool(&mut pool);

    // {1,2} is unknown: prefix {1}, hole {2}, then {2} ∪ {3,4,5}
    let node = node_of(&pool, target);
    assert_eq!(node.part1, SetRef::Single(PackageIndex::new(1)));
    let SetRef::Pooled(rest) = node.part2 else {
        panic!("rest should be pooled");
    };
    assert_eq!(pool.get(rest).origin(), SetOrigin::Synthesized);
    assert_eq!(pool.members(node.part2), indices(&[2, 3, 4, 5]).as_slice());

    let rest_node = node_of(&pool, node.part2);
    assert_eq!(rest_node.part1, SetRef::Single(PackageIndex::new(2)));
    assert_eq!(rest_node.part2, suffix);
    assert_ne!(rest_node.part2, short);
}

#[test]
fn test_synthesized_nodes_are_reused_by_larger_sets() {
    let graph = flat_graph(7);
    let mut pool = ReachablePool::new(&graph);

    pool.intern(indices(&[1, 2]));
    let four = pool.intern(indices(&[1, 2, 3, 4]));
    let five = pool.intern(indices(&[3, 4, 5, 6, 7]));

    let stats = decompose_pool(&mut pool);

    // the 4-set synthesizes {3,4} to fill its hole
    let four_node = node_of(&pool, four);
    assert_eq!(pool.members(four_node.part1), indices(&[1, 2]).as_slice());
    let SetRef::Pooled(synthesized) = four_node.part2 else {
        panic!("{{3,4}} should be pooled");
    };
    assert_eq!(pool.get(synthesized).origin(), SetOrigin::Synthesized);
    assert_eq!(pool.members(four_node.part2), indices(&[3, 4]).as_slice());

    // the 5-set comes later and uses it as its prefix
    let five_node = node_of(&pool, five);
    assert_eq!(five_node.part1, SetRef::Pooled(synthesized));
    assert_eq!(pool.members(five_node.part2), indices(&[5, 6, 7]).as_slice());
    let rest_node = node_of(&pool, five_node.part2);
    assert_eq!(pool.members(rest_node.part1), indices(&[5, 6]).as_slice());
    assert_eq!(rest_node.part2, SetRef::Single(PackageIndex::new(7)));

    // {3,4}, {5,6} and {5,6,7}
    assert_eq!(stats.synthesized, 3);
}

#[test]
fn test_processing_order_is_by_cardinality_not_discovery() {
    let graph = flat_graph(4);

    let mut first = ReachablePool::new(&graph);
    first.intern(indices(&[1, 2, 3, 4]));
    first.intern(indices(&[2, 3, 4]));
    decompose_pool(&mut first);

    let mut second = ReachablePool::new(&graph);
    second.intern(indices(&[2, 3, 4]));
    second.intern(indices(&[1, 2, 3, 4]));
    decompose_pool(&mut second);

    for pool in [&first, &second] {
        let big = pool.lookup(&indices(&[1, 2, 3, 4])).unwrap();
        let node = node_of(pool, big);
        assert_eq!(pool.members(node.part2), indices(&[2, 3, 4]).as_slice());
        assert_eq!(node.part1, SetRef::Single(PackageIndex::new(1)));
    }
}

#[test]
fn test_hybrid_split_separates_stable_and_local() {
    let graph = flat_graph_with_local(6, &[4, 5, 6]);
    let mut pool = ReachablePool::new(&graph);

    let target = pool.intern(indices(&[1, 2, 3, 4, 5, 6]));
    let stats = decompose_pool(&mut pool);
    assert_eq!(stats.hybrid_splits, 1);

    let node = node_of(&pool, target);
    assert_eq!(pool.members(node.part1), indices(&[1, 2, 3]).as_slice());
    assert_eq!(pool.members(node.part2), indices(&[4, 5, 6]).as_slice());

    let SetRef::Pooled(stable) = node.part1 else {
        panic!("stable half should be pooled");
    };
    assert_eq!(pool.get(stable).kind(), SetKind::Stable);
    let SetRef::Pooled(local) = node.part2 else {
        panic!("local half should be pooled");
    };
    assert_eq!(pool.get(local).kind(), SetKind::LocalDependent);
    assert!(!pool.get(local).is_hybrid());
}

#[test]
fn test_trivial_hybrid_pairs_lone_member_with_majority() {
    let graph = flat_graph_with_local(4, &[2]);
    let mut pool = ReachablePool::new(&graph);

    let stable_rest = pool.intern(indices(&[1, 3, 4]));
    let target = pool.intern(indices(&[1, 2, 3, 4]));
    decompose_pool(&mut pool);

    let node = node_of(&pool, target);
    assert_eq!(node.part1, stable_rest);
    assert_eq!(node.part2, SetRef::Single(PackageIndex::new(2)));

    let graph = flat_graph_with_local(4, &[2, 3, 4]);
    let mut pool = ReachablePool::new(&graph);
    let target = pool.intern(indices(&[1, 2, 3, 4]));
    decompose_pool(&mut pool);

    let node = node_of(&pool, target);
    assert_eq!(node.part1, SetRef::Single(PackageIndex::new(1)));
    assert_eq!(pool.members(node.part2), indices(&[2, 3, 4]).as_slice());
}

#[test]
fn test_scenario_graph_is_fully_decomposed() {
    let graph = scenario_graph();
    let mut pool = ReachablePool::build(&graph);
    decompose_pool(&mut pool);

    for (handle, _) in pool.iter() {
        assert_exact_partition(&pool, handle);
        assert_homogeneous_halves(&pool, handle);
    }
}

#[test]
fn test_second_run_is_a_no_op() {
    let graph = scenario_graph();
    let mut pool = ReachablePool::build(&graph);
    decompose_pool(&mut pool);
    let len = pool.len();

    let stats = decompose_pool(&mut pool);
    assert_eq!(stats, DecompositionStats::default());
    assert_eq!(pool.len(), len);
}

proptest! {
    #[test]
    fn prop_every_set_is_an_exact_homogeneous_partition(
        layout in prop::collection::vec((any::<bool>(), any::<u32>(), any::<u32>()), 0..14)
    ) {
        let graph = graph_from_masks(&layout);
        let mut pool = ReachablePool::build(&graph);
        decompose_pool(&mut pool);

        for (handle, set) in pool.iter() {
            prop_assert!(set.decomposition().is_some());
            assert_exact_partition(&pool, handle);
            assert_homogeneous_halves(&pool, handle);
        }
    }
}
