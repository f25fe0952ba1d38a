//! Sync applier: reconcile a target directory with a source snapshot
//!
//! For every upsert (new or changed) path the handler receives the full source
//! path and the matching subdirectory under the target. For every deleted path
//! it receives the path the file *used* to have in the source; it must derive
//! the target-side name from that string alone.
//!
//! Removals run before upserts, and each removal is followed by
//! [`SyncHandler::prune`], so a path that switched between file and directory
//! converges in a single pass.
//!
//! The applier assumes it is the only writer to the target directory between
//! invocations. External changes to the target may be overwritten, or surface
//! as ordinary handler errors.

mod handler;

pub use handler::{DefaultHandler, FnHandler, SyncHandler};

use std::path::{Path, PathBuf};

use dirsync_fs::split_relative;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::DiffResult;
use crate::snapshot::Snapshot;
use crate::{Error, Result};

/// Options for an apply pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// If true, compute the actions without invoking any handler.
    /// Actions will be prefixed with "[dry-run] would ..."
    pub dry_run: bool,
}

/// One action performed (or planned) by the applier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ApplyAction {
    Copied(String),
    Updated(String),
    Removed(String),
}

impl ApplyAction {
    /// The relative path the action concerns.
    pub fn path(&self) -> &str {
        match self {
            Self::Copied(p) | Self::Updated(p) | Self::Removed(p) => p,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            Self::Copied(_) => "copy",
            Self::Updated(_) => "update",
            Self::Removed(_) => "remove",
        }
    }
}

impl std::fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb(), self.path())
    }
}

/// Outcome of an apply pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Whether handlers were skipped
    pub dry_run: bool,
    /// Actions in the order they were executed
    pub actions: Vec<ApplyAction>,
}

impl ApplyReport {
    /// Number of new files copied.
    pub fn copied(&self) -> usize {
        self.count(|a| matches!(a, ApplyAction::Copied(_)))
    }

    /// Number of changed files re-copied.
    pub fn updated(&self) -> usize {
        self.count(|a| matches!(a, ApplyAction::Updated(_)))
    }

    /// Number of files removed.
    pub fn removed(&self) -> usize {
        self.count(|a| matches!(a, ApplyAction::Removed(_)))
    }

    /// Whether nothing was done.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Human-readable action lines.
    pub fn lines(&self) -> Vec<String> {
        self.actions
            .iter()
            .map(|action| {
                if self.dry_run {
                    format!("[dry-run] would {action}")
                } else {
                    action.to_string()
                }
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&ApplyAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}

/// Target subdirectory for a relative key: `target_dir` joined with the key's
/// parent directories.
pub fn target_subdir(target_dir: &Path, relative: &str) -> PathBuf {
    match split_relative(relative).0 {
        Some(parent) => parent
            .split('/')
            .fold(target_dir.to_path_buf(), |acc, segment| acc.join(segment)),
        None => target_dir.to_path_buf(),
    }
}

/// Apply `diff` to `target_dir` using `handler`.
///
/// Removals run first, each followed by [`SyncHandler::prune`], then new and
/// changed files. A path that turned from a file into a directory (or back)
/// is therefore free by the time it is upserted. The first handler failure
/// stops the pass and is returned as [`Error::Handler`]; actions already
/// performed stay performed.
///
/// # Errors
///
/// Returns the first handler error, wrapped with the offending path.
pub fn apply(
    snapshot: &Snapshot,
    target_dir: &Path,
    diff: &DiffResult,
    handler: &dyn SyncHandler,
    options: SyncOptions,
) -> Result<ApplyReport> {
    let mut report = ApplyReport {
        dry_run: options.dry_run,
        actions: Vec::with_capacity(diff.len()),
    };

    let removals = diff
        .deleted_paths
        .iter()
        .map(|p| ApplyAction::Removed(p.clone()));
    let upserts = diff.upserts().map(|p| {
        if diff.new_paths.contains(p) {
            ApplyAction::Copied(p.to_string())
        } else {
            ApplyAction::Updated(p.to_string())
        }
    });

    for action in removals.chain(upserts) {
        let relative = action.path();
        let source = snapshot.resolve(relative);
        let dir = target_subdir(target_dir, relative);

        if !options.dry_run {
            let outcome = match &action {
                ApplyAction::Copied(_) => handler.on_new(&source, &dir),
                ApplyAction::Updated(_) => handler.on_changed(&source, &dir),
                ApplyAction::Removed(_) => handler
                    .on_remove(&source, &dir)
                    .and_then(|()| handler.prune(&dir, target_dir)),
            };
            outcome.map_err(|e| Error::handler(relative, e))?;
        }

        debug!(%action, dry_run = options.dry_run, "applied action");
        report.actions.push(action);
    }

    if !report.is_empty() {
        info!(
            target_dir = %target_dir.display(),
            copied = report.copied(),
            updated = report.updated(),
            removed = report.removed(),
            dry_run = options.dry_run,
            "applied diff"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_subdir_mirrors_parent_directories() {
        let target = Path::new("/out");
        assert_eq!(target_subdir(target, "new.md"), PathBuf::from("/out"));
        assert_eq!(
            target_subdir(target, "sub/deeper/new.md"),
            PathBuf::from("/out").join("sub").join("deeper")
        );
    }

    #[test]
    fn dry_run_lines_are_prefixed() {
        let report = ApplyReport {
            dry_run: true,
            actions: vec![ApplyAction::Copied("a.txt".into())],
        };
        assert_eq!(report.lines(), vec!["[dry-run] would copy a.txt".to_string()]);
    }

    #[test]
    fn counts_by_kind() {
        let report = ApplyReport {
            dry_run: false,
            actions: vec![
                ApplyAction::Copied("a".into()),
                ApplyAction::Updated("b".into()),
                ApplyAction::Removed("c".into()),
                ApplyAction::Removed("d".into()),
            ],
        };
        assert_eq!((report.copied(), report.updated(), report.removed()), (1, 1, 2));
    }
}
