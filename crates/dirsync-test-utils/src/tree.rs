//! [`TestTree`] fixture for sync scenarios.
//!
//! Holds a temporary directory containing `source/` and `target/`, plus a
//! spare `state/` directory for persisted snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary source/target pair with helpers for setup and assertion.
///
/// All relative paths use `/` separators, matching snapshot keys.
///
/// # Example
///
/// ```rust,no_run
/// use dirsync_test_utils::tree::TestTree;
///
/// let tree = TestTree::new();
/// tree.write_source("sub/new.md", "hi");
/// tree.assert_target_missing("sub/new.md");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create empty `source/`, `target/` and `state/` directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["source", "target", "state"] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        Self { temp_dir }
    }

    /// The temporary root holding all three directories.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source(&self) -> PathBuf {
        self.root().join("source")
    }

    pub fn target(&self) -> PathBuf {
        self.root().join("target")
    }

    /// A path inside `state/` for persisted snapshots.
    pub fn state_file(&self, name: &str) -> PathBuf {
        self.root().join("state").join(name)
    }

    /// Write a file under `source/`, creating parent directories.
    pub fn write_source(&self, relative: &str, content: &str) {
        write(&self.source(), relative, content);
    }

    /// Write a file under `target/`, creating parent directories.
    pub fn write_target(&self, relative: &str, content: &str) {
        write(&self.target(), relative, content);
    }

    /// Delete a file under `source/`.
    pub fn remove_source(&self, relative: &str) {
        fs::remove_file(resolve(&self.source(), relative)).unwrap();
    }

    /// Read a file under `target/`.
    pub fn read_target(&self, relative: &str) -> String {
        let path = resolve(&self.target(), relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
    }

    /// Assert that `relative` exists under `target/` with exactly `content`.
    ///
    /// # Panics
    /// Panics with a descriptive message on mismatch.
    pub fn assert_target_content(&self, relative: &str, content: &str) {
        let actual = self.read_target(relative);
        assert_eq!(
            actual, content,
            "Target file {relative} has unexpected content"
        );
    }

    /// Assert that `relative` does **not** exist under `target/`.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_target_missing(&self, relative: &str) {
        let path = resolve(&self.target(), relative);
        assert!(
            !path.exists(),
            "Expected target file NOT to exist: {}",
            path.display()
        );
    }

    /// Relative paths of every regular file under `target/`, sorted.
    pub fn target_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect(&self.target(), "", &mut files);
        files.sort();
        files
    }
}

fn resolve(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}

fn write(base: &Path, relative: &str, content: &str) {
    let path = resolve(base, relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
}

fn collect(dir: &Path, prefix: &str, out: &mut Vec<String>) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type().unwrap();
        if file_type.is_dir() {
            collect(&entry.path(), &key, out);
        } else if file_type.is_file() {
            out.push(key);
        }
    }
}
