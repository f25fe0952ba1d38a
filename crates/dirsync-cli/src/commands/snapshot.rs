//! Snapshot command: scan a directory once

use std::path::Path;

use colored::Colorize;
use dirsync_core::{Persistence, Snapshot};

use super::canonical_dir;
use crate::error::Result;

/// Run the snapshot command
///
/// Prints the file count and tree hash, and persists the snapshot when `out`
/// is given so a later `watch --state` resumes from it.
pub fn run_snapshot(source: &Path, out: Option<&Path>) -> Result<Snapshot> {
    let snapshot = Snapshot::build(canonical_dir(source)?)?;

    println!(
        "{} {} files, tree hash {}",
        "OK".green().bold(),
        snapshot.len(),
        format!("{:016x}", snapshot.tree_hash()).cyan()
    );

    if let Some(out) = out {
        Persistence::File(out.to_path_buf()).save(&snapshot)?;
        println!("   saved to {}", out.display());
    }

    Ok(snapshot)
}
