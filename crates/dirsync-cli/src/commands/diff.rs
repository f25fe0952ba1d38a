//! Diff command implementation
//!
//! Previews what the next cycle would do without touching the target.

use std::path::Path;

use colored::Colorize;
use serde_json::json;

use dirsync_core::{DiffResult, Persistence, Snapshot, diff};

use super::canonical_dir;
use crate::error::{CliError, Result};

/// Run the diff command
pub fn run_diff(source: &Path, state: &Path, json: bool) -> Result<()> {
    let (current, result) = compute_diff(source, state)?;

    if json {
        let output = json!({
            "has_changes": !result.is_empty(),
            "files": current.len(),
            "tree_hash": format!("{:016x}", current.tree_hash()),
            "new": result.new_paths,
            "changed": result.changed_paths,
            "deleted": result.deleted_paths,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_diff_output(&current, &result);
    }

    Ok(())
}

/// Scan `source` and diff it against the snapshot persisted at `state`.
pub fn compute_diff(source: &Path, state: &Path) -> Result<(Snapshot, DiffResult)> {
    let previous = Persistence::File(state.to_path_buf())
        .load()?
        .ok_or_else(|| {
            CliError::user(format!("No persisted snapshot at {}", state.display()))
        })?;

    let current = Snapshot::build(canonical_dir(source)?)?;
    let result = diff(&previous, &current);
    Ok((current, result))
}

fn print_diff_output(current: &Snapshot, result: &DiffResult) {
    if result.is_empty() {
        println!("{} No changes since the last snapshot.", "OK".green().bold());
        return;
    }

    println!(
        "{} {} ({})",
        "Diff".blue().bold(),
        current.root().display().to_string().yellow(),
        result.to_string().cyan()
    );
    println!();

    for path in &result.new_paths {
        println!("   {} {}", "+".green(), path);
    }
    for path in &result.changed_paths {
        println!("   {} {}", "~".yellow(), path);
    }
    for path in &result.deleted_paths {
        println!("   {} {}", "-".red(), path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_test_utils::tree::TestTree;

    #[test]
    fn diff_against_saved_snapshot() {
        let tree = TestTree::new();
        tree.write_source("keep.txt", "k");
        tree.write_source("edit.txt", "v1");
        let state = tree.state_file("state.json");
        Persistence::File(state.clone())
            .save(&Snapshot::build(tree.source()).unwrap())
            .unwrap();

        tree.write_source("edit.txt", "v2");
        tree.write_source("sub/fresh.txt", "f");
        tree.remove_source("keep.txt");

        let (_, result) = compute_diff(&tree.source(), &state).unwrap();

        assert!(result.new_paths.contains("sub/fresh.txt"));
        assert!(result.changed_paths.contains("edit.txt"));
        assert!(result.deleted_paths.contains("keep.txt"));
        tree.assert_target_missing("sub/fresh.txt");
    }

    #[test]
    fn missing_state_is_a_user_error() {
        let tree = TestTree::new();
        let err = compute_diff(&tree.source(), &tree.state_file("absent.json")).unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
    }
}
