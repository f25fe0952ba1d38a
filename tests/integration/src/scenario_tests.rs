//! End-to-end sync scenarios
//!
//! Each test drives the full scan -> diff -> apply path through
//! `run_cycle`, carrying state between steps exactly as the watch loop does.

use std::collections::BTreeSet;

use dirsync_core::{
    CycleReport, CycleState, DefaultHandler, DiffResult, Snapshot, SyncConfig, SyncOptions, diff,
    run_cycle,
};
use dirsync_test_utils::tree::TestTree;
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Drives cycles against a [`TestTree`], keeping the state between them.
struct Session {
    tree: TestTree,
    config: SyncConfig,
    state: CycleState,
}

impl Session {
    fn start() -> Self {
        let tree = TestTree::new();
        let config = SyncConfig::new(tree.source(), tree.target());
        let mut session = Self {
            tree,
            config,
            state: CycleState::fresh(),
        };
        let baseline = session.step();
        assert!(baseline.baseline);
        session
    }

    fn step(&mut self) -> CycleReport {
        let state = std::mem::take(&mut self.state);
        let (next, outcome) = run_cycle(&self.config, state, &DefaultHandler, SyncOptions::default());
        self.state = next;
        outcome.unwrap()
    }
}

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

fn expect(new: &[&str], changed: &[&str], deleted: &[&str]) -> DiffResult {
    DiffResult {
        new_paths: set(new),
        changed_paths: set(changed),
        deleted_paths: set(deleted),
    }
}

#[test]
fn empty_source_has_no_files_and_no_self_diff() {
    let tree = TestTree::new();
    let snapshot = Snapshot::build(tree.source()).unwrap();

    assert!(snapshot.file_hashes().is_empty());
    assert_eq!(snapshot.tree_hash(), 0);
    assert!(diff(&snapshot, &snapshot).is_empty());
}

#[rstest]
#[case::top_level("new.md", "")]
#[case::nested("sub/new.md", "sub")]
fn create_modify_delete(#[case] relative: &str, #[case] subdir: &str) {
    let mut session = Session::start();

    session.tree.write_source(relative, "hi");
    let created = session.step();
    assert_eq!(created.diff, expect(&[relative], &[], &[]));
    session.tree.assert_target_content(relative, "hi");
    if !subdir.is_empty() {
        assert!(session.tree.target().join(subdir).is_dir());
    }

    session.tree.write_source(relative, "bye");
    let modified = session.step();
    assert_eq!(modified.diff, expect(&[], &[relative], &[]));
    session.tree.assert_target_content(relative, "bye");

    session.tree.remove_source(relative);
    let deleted = session.step();
    assert_eq!(deleted.diff, expect(&[], &[], &[relative]));
    session.tree.assert_target_missing(relative);
}

#[test]
fn unchanged_tree_short_circuits() {
    let tree = TestTree::new();
    tree.write_source("a.txt", "a");
    tree.write_source("sub/b.txt", "b");

    let first = Snapshot::build(tree.source()).unwrap();
    let second = Snapshot::build(tree.source()).unwrap();

    assert_eq!(first.tree_hash(), second.tree_hash());
    assert!(!first.has_changed(&second));
    let result = diff(&first, &second);
    assert!(result.new_paths.is_empty());
    assert!(result.changed_paths.is_empty());
    assert!(result.deleted_paths.is_empty());
}

#[test]
fn rewrite_with_same_content_is_not_a_change() {
    let mut session = Session::start();
    session.tree.write_source("a.txt", "same");
    session.step();

    session.tree.write_source("a.txt", "same");
    let report = session.step();

    assert!(report.is_idle());
}

#[test]
fn mixed_changes_in_one_cycle() {
    let mut session = Session::start();
    session.tree.write_source("keep.txt", "k");
    session.tree.write_source("docs/edit.md", "v1");
    session.tree.write_source("docs/old/gone.md", "g");
    session.step();

    session.tree.write_source("docs/edit.md", "v2");
    session.tree.remove_source("docs/old/gone.md");
    session.tree.write_source("docs/new/fresh.md", "f");
    let report = session.step();

    assert_eq!(
        report.diff,
        expect(&["docs/new/fresh.md"], &["docs/edit.md"], &["docs/old/gone.md"])
    );
    assert_eq!(
        session.tree.target_files(),
        vec!["docs/edit.md", "docs/new/fresh.md", "keep.txt"]
    );
}

#[test]
fn target_converges_and_stays_converged() {
    let mut session = Session::start();
    for (path, content) in [
        ("a.txt", "1"),
        ("b/c.txt", "2"),
        ("b/d/e.txt", "3"),
        ("f/g.txt", "4"),
    ] {
        session.tree.write_source(path, content);
    }
    session.step();
    session.tree.remove_source("b/c.txt");
    session.tree.write_source("f/g.txt", "5");
    session.step();

    let source = Snapshot::build(session.tree.source()).unwrap();
    let target = Snapshot::build(session.tree.target()).unwrap();
    assert_eq!(source.file_hashes(), target.file_hashes());
    assert_eq!(source.tree_hash(), target.tree_hash());

    // Further cycles are no-ops.
    assert!(session.step().is_idle());
    assert!(session.step().is_idle());
}

#[test]
fn file_and_directory_swaps_converge_across_cycles() {
    let mut session = Session::start();
    session.tree.write_source("foo", "file");
    session.step();

    // File becomes a directory.
    session.tree.remove_source("foo");
    session.tree.write_source("foo/bar.txt", "nested");
    let report = session.step();
    assert_eq!(report.diff, expect(&["foo/bar.txt"], &[], &["foo"]));
    assert_eq!(session.tree.target_files(), vec!["foo/bar.txt"]);

    // And back again.
    std::fs::remove_dir_all(session.tree.source().join("foo")).unwrap();
    session.tree.write_source("foo", "file again");
    let report = session.step();
    assert_eq!(report.diff, expect(&["foo"], &[], &["foo/bar.txt"]));
    session.tree.assert_target_content("foo", "file again");

    assert!(session.step().is_idle());
}
