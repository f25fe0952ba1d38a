//! The watch loop running on a background thread while files change.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use dirsync_core::{CycleDriver, Persistence, SyncConfig};
use dirsync_test_utils::tree::TestTree;

fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn loop_picks_up_changes_and_stops_on_request() {
    let tree = TestTree::new();
    let state_file = tree.state_file("state.json");
    let config = SyncConfig::new(tree.source(), tree.target())
        .with_interval(Duration::from_millis(20))
        .with_persistence(Persistence::File(state_file.clone()));

    let stop = Arc::new(AtomicBool::new(false));
    let handle = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || CycleDriver::new(config).run(&stop))
    };

    // The baseline cycle persists the (empty) snapshot.
    wait_for("baseline snapshot", || state_file.exists());

    tree.write_source("sub/new.md", "hi");
    let target_file = tree.target().join("sub").join("new.md");
    wait_for("file to be copied", || {
        fs::read_to_string(&target_file).is_ok_and(|content| content == "hi")
    });

    tree.remove_source("sub/new.md");
    wait_for("file to be removed", || !target_file.exists());

    stop.store(true, Ordering::Relaxed);
    let summary = handle.join().unwrap();

    assert!(summary.cycles >= 3);
    assert_eq!(summary.failed, 0);
    assert!(summary.state.previous.unwrap().is_empty());
}
