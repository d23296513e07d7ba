//! Full pipeline over manifest-defined graphs.

use aggcache::aggregate::IdComponent;
use aggcache::cache::CacheBuilder;
use aggcache::graph::{PackageGraph, PackageIndex};
use aggcache::test_utils::{GraphFixture, init_test_logging, scenario_graph};

use super::graph_of;

fn index_of(graph: &PackageGraph, name: &str) -> PackageIndex {
    graph.find(name).unwrap_or_else(|| panic!("no package {name}")).index()
}

#[test]
fn test_reference_scenario() {
    init_test_logging(None);
    let mut cache = CacheBuilder::new().build(scenario_graph());
    let (p0, p1, p2, p3) = (PackageIndex::HEAD, PackageIndex::new(1), PackageIndex::new(2), PackageIndex::new(3));

    assert_eq!(cache.after_reachable(p3), &[p0, p1, p2]);

    let id = cache.register_aggregate([p1, p2]);
    assert_eq!(id.stable, IdComponent::Single(p1));
    assert_eq!(id.local, IdComponent::Single(p2));
    assert_eq!(&*cache.get_closure(id), &[p0, p1, p2]);
}

#[test]
fn test_manifest_order_is_irrelevant() {
    let graph = graph_of(&GraphFixture::scenario());
    let mut cache = CacheBuilder::new().build(graph);
    let graph = cache.graph().clone();

    let p1 = index_of(&graph, "p1");
    let p2 = index_of(&graph, "p2");
    let p3 = index_of(&graph, "p3");
    let themes = index_of(&graph, "themes");
    let icons = index_of(&graph, "icons");

    assert!(p1 < p3 && p2 < p3);
    assert!(icons < themes);
    assert!(graph.is_stable(themes));
    assert!(graph.is_local_dependent(p3));

    // themes contains icons, so both reach p1 and Head only
    let mut expected = vec![PackageIndex::HEAD, p1, icons];
    expected.sort_unstable();
    assert_eq!(cache.after_reachable(themes), expected.as_slice());

    // the Tail closure is the whole graph
    assert_eq!(cache.reachable(graph.tail().index()).len(), graph.len());

    let id = cache.register_aggregate([themes, p3]);
    assert!(id.is_hybrid());
    assert_eq!(cache.get_closure(id).len(), graph.len() - 1);
}

#[test]
fn test_layered_graph_shares_stable_sets() {
    let graph = graph_of(&GraphFixture::layered());
    let cache = CacheBuilder::new().live(true).build(graph);
    let graph = cache.graph();
    let stats = cache.stats();

    // app1 is the only stable app; app0 and app2 are local
    assert_eq!(stats.local_dependent_packages, 3);
    assert!(stats.stable_sets > 0);
    assert!(stats.local_sets > 0);

    for app in ["app0", "app1", "app2"] {
        let after = cache.after_reachable(index_of(graph, app));
        // Head plus the whole base chain
        assert_eq!(after.len(), 7, "{app}");
    }

    let app0 = cache.package_aggregates(index_of(graph, "app0"));
    let app1 = cache.package_aggregates(index_of(graph, "app1"));
    assert_eq!(app0.after.stable, app1.after.stable);
    assert!(app0.after.local.is_absent());

    // every stable identifier is referenced from a local-dependent package
    for handle in cache.stable_identifiers() {
        assert!(graph.packages().iter().any(|p| {
            let ids = cache.package_aggregates(p.index());
            p.is_eventually_local_dependent()
                && (ids.requires.stable.handle() == Some(handle) || ids.children.stable.handle() == Some(handle))
        }));
    }
}

#[test]
fn test_every_pooled_set_is_decomposed() {
    let cache = CacheBuilder::new().build(graph_of(&GraphFixture::layered()));
    let pool = cache.pool();

    for (_, set) in pool.iter() {
        let node = set.decomposition().expect("decomposed");
        let mut union = [pool.members(node.part1), pool.members(node.part2)].concat();
        union.sort_unstable();
        assert_eq!(union.as_slice(), set.members());
    }
}
