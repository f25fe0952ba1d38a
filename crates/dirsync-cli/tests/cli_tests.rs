//! Integration tests for the dirsync binary.
//!
//! These tests exercise the compiled binary using assert_cmd.

use assert_cmd::Command;
use dirsync_test_utils::tree::TestTree;
use predicates::prelude::*;
use std::fs;

/// Get a Command for the dirsync binary
fn dirsync_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dirsync"))
}

// ============================================================================
// Help and Version
// ============================================================================

#[test]
fn test_help_output() {
    dirsync_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mirror a directory"));
}

#[test]
fn test_version_output() {
    dirsync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dirsync"));
}

#[test]
fn test_no_command_shows_help_hint() {
    dirsync_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("dirsync --help"));
}

#[test]
fn test_completions_bash() {
    dirsync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dirsync"));
}

// ============================================================================
// once
// ============================================================================

#[test]
fn test_once_all_new_copies_everything() {
    let tree = TestTree::new();
    tree.write_source("a.txt", "a");
    tree.write_source("sub/b.txt", "b");

    dirsync_cmd()
        .arg("once")
        .arg(tree.source())
        .arg(tree.target())
        .args(["--baseline", "all-new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("copy sub/b.txt"))
        .stdout(predicate::str::contains("2 copied"));

    tree.assert_target_content("a.txt", "a");
    tree.assert_target_content("sub/b.txt", "b");
}

#[test]
fn test_once_dry_run_leaves_target_alone() {
    let tree = TestTree::new();
    tree.write_source("a.txt", "a");

    dirsync_cmd()
        .arg("once")
        .arg(tree.source())
        .arg(tree.target())
        .args(["--baseline", "all-new", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run] would copy a.txt"));

    tree.assert_target_missing("a.txt");
}

#[test]
fn test_once_with_state_file_syncs_only_new_files() {
    let tree = TestTree::new();
    let state = tree.state_file("state.json");
    tree.write_source("existing.txt", "e");

    dirsync_cmd()
        .arg("once")
        .arg(tree.source())
        .arg(tree.target())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Baseline recorded"));
    assert!(state.exists());

    tree.write_source("later.txt", "l");
    dirsync_cmd()
        .arg("once")
        .arg(tree.source())
        .arg(tree.target())
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("copy later.txt"));

    tree.assert_target_content("later.txt", "l");
    tree.assert_target_missing("existing.txt");
}

#[test]
fn test_once_from_config_file() {
    let tree = TestTree::new();
    tree.write_source("a.txt", "a");
    let config = tree.root().join("dirsync.toml");
    fs::write(
        &config,
        "source = \"source\"\ntarget = \"target\"\nbaseline = \"all-new\"\n",
    )
    .unwrap();

    dirsync_cmd()
        .arg("once")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    tree.assert_target_content("a.txt", "a");
}

#[test]
fn test_once_missing_source_fails() {
    let tree = TestTree::new();

    dirsync_cmd()
        .arg("once")
        .arg(tree.root().join("missing"))
        .arg(tree.target())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_target_inside_source_fails() {
    let tree = TestTree::new();

    dirsync_cmd()
        .arg("once")
        .arg(tree.source())
        .arg(tree.source().join("mirror"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("lies inside source"));
}

// ============================================================================
// watch
// ============================================================================

#[test]
fn test_watch_bounded_by_max_cycles() {
    let tree = TestTree::new();
    tree.write_source("sub/new.md", "hi");

    dirsync_cmd()
        .arg("watch")
        .arg(tree.source())
        .arg(tree.target())
        .args(["--interval-ms", "10", "--max-cycles", "2", "--baseline", "all-new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped after 2 cycles"));

    tree.assert_target_content("sub/new.md", "hi");
}

// ============================================================================
// snapshot and diff
// ============================================================================

#[test]
fn test_snapshot_then_diff_json() {
    let tree = TestTree::new();
    tree.write_source("a.txt", "a");
    let state = tree.state_file("snap.json");

    dirsync_cmd()
        .arg("snapshot")
        .arg(tree.source())
        .arg("--out")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files"));

    tree.write_source("b.txt", "b");

    let output = dirsync_cmd()
        .arg("diff")
        .arg(tree.source())
        .arg("--state")
        .arg(&state)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["has_changes"], serde_json::json!(true));
    assert_eq!(json["new"], serde_json::json!(["b.txt"]));
    assert_eq!(json["deleted"], serde_json::json!([]));
}

#[test]
fn test_diff_without_state_fails() {
    let tree = TestTree::new();

    dirsync_cmd()
        .arg("diff")
        .arg(tree.source())
        .arg("--state")
        .arg(tree.state_file("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No persisted snapshot"));
}
