//! Content-addressed snapshots of a directory tree
//!
//! A [`Snapshot`] maps every regular file under a root (keyed by its
//! `/`-separated path relative to that root) to a [`ContentHash`] of its
//! bytes, plus an order-independent tree hash over all entries.
//!
//! # Traversal policy
//!
//! The tree is walked with `walkdir` without following links. Entries are
//! classified by their own file type:
//!
//! - directories are descended into
//! - regular files are hashed
//! - symbolic links, sockets, FIFOs and device nodes are skipped
//! - entries whose relative path is not valid UTF-8 are skipped with a
//!   warning, together with everything under such a directory
//!
//! The root itself may be a symlink to a directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use dirsync_fs::checksum::entry_digest;
use dirsync_fs::{ContentHash, NormalizedPath};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// The observed state of a directory tree at one instant.
///
/// Snapshots are immutable; a rescan produces a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: PathBuf,
    file_hashes: BTreeMap<String, ContentHash>,
    tree_hash: u64,
}

impl Snapshot {
    /// Scan `root` recursively and hash every regular file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScanIo`] if the root is missing or not a directory, or
    /// if any directory or file under it cannot be read. No partial snapshot
    /// is returned.
    pub fn build(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let metadata = fs::metadata(root).map_err(|e| Error::scan(root, e))?;
        if !metadata.is_dir() {
            return Err(Error::scan(
                root,
                std::io::Error::new(ErrorKind::NotADirectory, "snapshot root is not a directory"),
            ));
        }

        let file_hashes = scan(root)?;
        debug!(root = %root.display(), files = file_hashes.len(), "built snapshot");

        let tree_hash = tree_hash(&file_hashes);
        Ok(Self {
            root: root.to_path_buf(),
            file_hashes,
            tree_hash,
        })
    }

    /// Build a snapshot from an existing path → hash map.
    ///
    /// Keys are normalized to `/` separators and the tree hash is always
    /// recomputed, never taken on trust.
    pub fn from_hashes(
        root: impl Into<PathBuf>,
        file_hashes: impl IntoIterator<Item = (String, ContentHash)>,
    ) -> Self {
        let file_hashes: BTreeMap<String, ContentHash> = file_hashes
            .into_iter()
            .map(|(path, hash)| (NormalizedPath::new(&path).as_str().to_string(), hash))
            .collect();
        let tree_hash = tree_hash(&file_hashes);
        Self {
            root: root.into(),
            file_hashes,
            tree_hash,
        }
    }

    /// An empty snapshot of `root`.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self::from_hashes(root, std::iter::empty())
    }

    /// The directory this snapshot describes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path → content hash for every file.
    pub fn file_hashes(&self) -> &BTreeMap<String, ContentHash> {
        &self.file_hashes
    }

    /// Order-independent aggregate of all entries.
    pub fn tree_hash(&self) -> u64 {
        self.tree_hash
    }

    /// Hash of a single relative path, if present.
    pub fn get(&self, relative: &str) -> Option<ContentHash> {
        self.file_hashes.get(relative).copied()
    }

    /// Whether `relative` is part of this snapshot.
    pub fn contains(&self, relative: &str) -> bool {
        self.file_hashes.contains_key(relative)
    }

    /// Iterate over the relative paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.file_hashes.keys().map(String::as_str)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.file_hashes.len()
    }

    /// Whether the tree held no files.
    pub fn is_empty(&self) -> bool {
        self.file_hashes.is_empty()
    }

    /// Cheap "did anything change" check via the tree hash.
    pub fn has_changed(&self, other: &Snapshot) -> bool {
        self.tree_hash != other.tree_hash
    }

    /// Absolute source path for a relative key.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

/// Combine entry digests with wrapping addition so the result does not depend
/// on iteration order.
fn tree_hash(file_hashes: &BTreeMap<String, ContentHash>) -> u64 {
    file_hashes
        .iter()
        .fold(0u64, |acc, (path, hash)| acc.wrapping_add(entry_digest(path, *hash)))
}

fn scan(root: &Path) -> Result<BTreeMap<String, ContentHash>> {
    let mut file_hashes = BTreeMap::new();
    let mut entries = WalkDir::new(root).follow_links(false).min_depth(1).into_iter();

    while let Some(entry) = entries.next() {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        let file_type = entry.file_type();

        let Some(key) = relative_key(root, entry.path()) else {
            warn!(path = %entry.path().display(), "skipping entry with a non-UTF-8 name");
            if file_type.is_dir() {
                entries.skip_current_dir();
            }
            continue;
        };

        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            debug!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }

        let hash = ContentHash::of_file(entry.path()).map_err(|e| match e {
            dirsync_fs::Error::Io { path, source } => Error::scan(path, source),
            other => Error::Fs(other),
        })?;
        trace!(path = %key, %hash, "hashed file");
        file_hashes.insert(key, hash);
    }

    Ok(file_hashes)
}

/// `/`-joined path of `path` relative to `root`, or `None` if any component
/// is not valid UTF-8.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments = relative
        .components()
        .map(|component| match component {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

fn walk_error(root: &Path, error: walkdir::Error) -> Error {
    let path = error.path().unwrap_or(root).to_path_buf();
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    Error::scan(path, source)
}
