//! Diff engine: classify every path between two snapshots
//!
//! Each path present in either snapshot lands in exactly one of new, changed,
//! deleted or (implicitly) unchanged. When the tree hashes match the per-path
//! comparison is skipped entirely.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::snapshot::Snapshot;

/// The transition between an old and a new snapshot of the same root.
///
/// The three sets are pairwise disjoint. Iteration is sorted for stable
/// reports, but no meaning is attached to the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Present in new, absent in old
    pub new_paths: BTreeSet<String>,
    /// Present in both with differing hash
    pub changed_paths: BTreeSet<String>,
    /// Present in old, absent in new
    pub deleted_paths: BTreeSet<String>,
}

impl DiffResult {
    /// A diff with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Treat every file in `snapshot` as new.
    pub fn all_new(snapshot: &Snapshot) -> Self {
        Self {
            new_paths: snapshot.paths().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// Whether no path was added, changed or removed.
    pub fn is_empty(&self) -> bool {
        self.new_paths.is_empty() && self.changed_paths.is_empty() && self.deleted_paths.is_empty()
    }

    /// Total number of affected paths.
    pub fn len(&self) -> usize {
        self.new_paths.len() + self.changed_paths.len() + self.deleted_paths.len()
    }

    /// Paths that need copying into the target: new ∪ changed.
    pub fn upserts(&self) -> impl Iterator<Item = &str> {
        self.new_paths
            .iter()
            .chain(self.changed_paths.iter())
            .map(String::as_str)
    }
}

impl std::fmt::Display for DiffResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} new, {} changed, {} deleted",
            self.new_paths.len(),
            self.changed_paths.len(),
            self.deleted_paths.len()
        )
    }
}

/// Compare `old` against `new`.
///
/// Both snapshots are assumed to describe the same root; this is not checked.
pub fn diff(old: &Snapshot, new: &Snapshot) -> DiffResult {
    if !old.has_changed(new) {
        return DiffResult::empty();
    }

    let mut result = DiffResult::empty();

    for (path, new_hash) in new.file_hashes() {
        match old.get(path) {
            None => {
                result.new_paths.insert(path.clone());
            }
            Some(old_hash) if old_hash != *new_hash => {
                result.changed_paths.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    result.deleted_paths = old
        .paths()
        .filter(|path| !new.contains(path))
        .map(str::to_string)
        .collect();

    result
}
