//! Tests for the `aggcache` binary.

use aggcache::test_utils::GraphFixture;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Temp project with the scenario graph written to `graph.toml`.
fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("graph.toml"), GraphFixture::scenario().content).unwrap();
    temp
}

fn aggcache(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aggcache").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("AGGCACHE_LIVE")
        .env_remove("AGGCACHE_LIVE_STATE");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success();
    serde_json::from_slice(&output.get_output().stdout).unwrap()
}

#[test]
fn test_build_prints_summary() {
    let temp = project();

    aggcache(temp.path())
        .args(["build", "--graph", "graph.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Built aggregate cache for 7 packages (3 local-dependent)"));

    assert!(!temp.path().join(".aggcache").exists());
}

#[test]
fn test_build_json_report() {
    let temp = project();
    let report = json_stdout(aggcache(temp.path()).args(["build", "--graph", "graph.toml", "--format", "json"]));

    assert_eq!(report["live"], false);
    assert_eq!(report["stats"]["packages"], 7);
    assert!(report["fingerprint"].as_str().unwrap().starts_with("sha256:"));
    assert!(report.get("state_path").is_none());
}

#[test]
fn test_live_build_writes_and_reuses_state() {
    let temp = project();
    let state = temp.path().join("state").join("live.bin");
    let args = ["build", "--graph", "graph.toml", "--live", "--state", "state/live.bin", "--format", "json"];

    let first = json_stdout(aggcache(temp.path()).args(args));
    assert_eq!(first["reused_state"], false);
    assert!(state.is_file());

    let second = json_stdout(aggcache(temp.path()).args(args));
    assert_eq!(second["reused_state"], true);
    assert_eq!(
        second["stats"]["seeded_stable_aggregates"],
        first["stats"]["stable_aggregates"]
    );
}

#[test]
fn test_corrupt_state_triggers_full_rebuild() {
    let temp = project();
    let state = temp.path().join("live.bin");
    fs::write(&state, b"not a live state").unwrap();

    let output = aggcache(temp.path())
        .args(["build", "--graph", "graph.toml", "--live", "--state", "live.bin", "--format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring live state"));
    let report: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(report["reused_state"], false);

    // the rewritten state is valid again
    let again = json_stdout(aggcache(temp.path()).args([
        "build", "--graph", "graph.toml", "--live", "--state", "live.bin", "--format", "json",
    ]));
    assert_eq!(again["reused_state"], true);
}

#[test]
fn test_live_mode_from_config_file() {
    let temp = project();
    fs::write(temp.path().join("aggcache.toml"), "[live]\nenabled = true\nstate_path = \"cache.bin\"\n").unwrap();

    aggcache(temp.path()).args(["build", "--graph", "graph.toml", "--quiet"]).assert().success();
    assert!(temp.path().join("cache.bin").is_file());
}

#[test]
fn test_live_mode_from_environment() {
    let temp = project();

    aggcache(temp.path())
        .env("AGGCACHE_LIVE", "1")
        .args(["build", "--graph", "graph.toml", "--quiet"])
        .assert()
        .success();
    assert!(temp.path().join(".aggcache").join("live-state.bin").is_file());
}

#[test]
fn test_closure_reports_identity() {
    let temp = project();
    let report = json_stdout(aggcache(temp.path()).args([
        "closure", "--graph", "graph.toml", "p2", "p1", "--format", "json",
    ]));

    assert_eq!(report["id"]["stable"]["kind"], "single");
    assert_eq!(report["id"]["local"]["kind"], "single");
    let closure: Vec<&str> =
        report["closure"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert_eq!(closure.len(), 3);
    assert_eq!(closure[0], "<head>");
    assert!(closure.contains(&"p1") && closure.contains(&"p2"));
}

#[test]
fn test_closure_text_output() {
    let temp = project();

    aggcache(temp.path())
        .args(["closure", "--graph", "graph.toml", "themes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(4 packages)"));
}

#[test]
fn test_unknown_package_fails() {
    let temp = project();

    aggcache(temp.path())
        .args(["closure", "--graph", "graph.toml", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package 'nope' not found in graph"));
}

#[test]
fn test_cycle_is_reported() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("graph.toml"),
        "[[package]]\nname = \"a\"\nrequires = [\"b\"]\n\n[[package]]\nname = \"b\"\nchildren = [\"a\"]\n",
    )
    .unwrap();

    aggcache(temp.path())
        .args(["build", "--graph", "graph.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency detected"));
}

#[test]
fn test_missing_graph_fails() {
    let temp = TempDir::new().unwrap();

    aggcache(temp.path())
        .args(["build", "--graph", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}
