//! Live-state persistence across reload cycles.

use aggcache::cache::CacheBuilder;
use aggcache::graph::manifest::GraphManifest;
use aggcache::live::{LiveState, LiveStateFile, load_live_state};
use aggcache::test_utils::GraphFixture;
use std::fs;
use tempfile::TempDir;

use super::graph_of;

#[test]
fn test_second_cycle_reuses_stable_table() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".aggcache").join("live-state.bin");

    let first = CacheBuilder::new().live(true).build(graph_of(&GraphFixture::layered()));
    LiveStateFile::new(first.graph(), &first.live_state()).unwrap().save(&path).unwrap();

    let graph = graph_of(&GraphFixture::layered());
    let state = load_live_state(&path, &graph).expect("state should load");
    assert_eq!(state, first.live_state());

    let second = CacheBuilder::new().with_live_state(state).build(graph);
    assert_eq!(second.stats().seeded_stable_aggregates, first.stats().stable_aggregates);
    assert_eq!(second.live_state(), first.live_state());
    assert_eq!(second.stable_identifiers(), first.stable_identifiers());
}

#[test]
fn test_editing_a_local_package_keeps_the_state() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("live-state.bin");

    let first = CacheBuilder::new().live(true).build(graph_of(&GraphFixture::layered()));
    LiveStateFile::new(first.graph(), &first.live_state()).unwrap().save(&path).unwrap();

    // app2 stops requiring base4; app2 is local, so only local sets change
    let edited = GraphFixture::layered().content.replace(
        "name = \"app2\"\nlocal = true\nrequires = [\"base5\", \"base4\"]",
        "name = \"app2\"\nlocal = true\nrequires = [\"base5\"]",
    );
    assert_ne!(edited, GraphFixture::layered().content);
    let graph = GraphManifest::parse(&edited, "edited.toml").unwrap().to_graph().unwrap();

    let state = load_live_state(&path, &graph).expect("stable part is unchanged");
    let second = CacheBuilder::new().with_live_state(state.clone()).build(graph);
    let reloaded = second.live_state();
    assert_eq!(&reloaded.stable_aggregates[..state.stable_aggregates.len()], state.stable_aggregates.as_slice());
}

#[test]
fn test_editing_a_stable_package_discards_the_state() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("live-state.bin");

    let first = CacheBuilder::new().live(true).build(graph_of(&GraphFixture::layered()));
    LiveStateFile::new(first.graph(), &first.live_state()).unwrap().save(&path).unwrap();

    let edited = GraphFixture::layered().content.replace("name = \"base3\"", "name = \"base3-renamed\"");
    let edited = edited.replace("requires = [\"base3\"]", "requires = [\"base3-renamed\"]");
    let graph = GraphManifest::parse(&edited, "edited.toml").unwrap().to_graph().unwrap();

    assert!(load_live_state(&path, &graph).is_none());
}

#[test]
fn test_damaged_state_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("live-state.bin");
    let graph = graph_of(&GraphFixture::scenario());

    let cache = CacheBuilder::new().live(true).build(graph.clone());
    LiveStateFile::new(&graph, &cache.live_state()).unwrap().save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();

    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
    assert!(load_live_state(&path, &graph).is_none());

    let mut trailing = bytes.clone();
    trailing.extend_from_slice(b"xx");
    fs::write(&path, &trailing).unwrap();
    assert!(load_live_state(&path, &graph).is_none());

    fs::write(&path, &bytes).unwrap();
    assert!(load_live_state(&path, &graph).is_some());
}

#[test]
fn test_seed_with_foreign_entries_falls_back() {
    let graph = graph_of(&GraphFixture::scenario());
    let p3 = graph.find("p3").unwrap().index().as_u32() as i32;

    let bogus = LiveState {
        stable_aggregates: vec![vec![0, p3]],
        ..LiveState::default()
    };
    let cache = CacheBuilder::new().with_live_state(bogus).build(graph.clone());
    let reference = CacheBuilder::new().live(true).build(graph);

    assert_eq!(cache.stats().seeded_stable_aggregates, 0);
    assert_eq!(cache.live_state(), reference.live_state());
}
