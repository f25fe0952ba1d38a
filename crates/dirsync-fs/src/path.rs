//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Snapshot keys are always relative paths in this form (`"sub/file.txt"`),
/// so a snapshot taken on one platform compares equal to one taken on
/// another. Conversion to a native `PathBuf` only happens at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes, drops `.` segments and
    /// collapses repeated separators. A leading `//` (network share) is kept.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        if segment_normalized.is_empty() {
            return self.clone();
        }
        if self.inner.is_empty() {
            return Self {
                inner: clean(&segment_normalized),
            };
        }
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Path of `self` relative to `base`, if `base` is a component-wise prefix.
    pub fn strip_prefix(&self, base: &NormalizedPath) -> Option<Self> {
        let base = base.inner.trim_end_matches('/');
        if base.is_empty() {
            return Some(self.clone());
        }
        let rest = self.inner.strip_prefix(base)?;
        if rest.is_empty() {
            return Some(Self {
                inner: String::new(),
            });
        }
        rest.strip_prefix('/').map(|r| Self {
            inner: r.to_string(),
        })
    }

    /// Whether `self` equals `base` or lies underneath it.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        self.strip_prefix(base).is_some()
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }
}

/// Split a relative snapshot key into its parent-directory part and file name.
///
/// `"sub/dir/file.txt"` yields `(Some("sub/dir"), "file.txt")`; a top-level key
/// yields `(None, key)`. Works on the string alone and never touches disk.
pub fn split_relative(relative: &str) -> (Option<&str>, &str) {
    match relative.rfind('/') {
        Some(idx) => (Some(&relative[..idx]), &relative[idx + 1..]),
        None => (None, relative),
    }
}

/// Canonicalize a path without the `\\?\` prefix on Windows.
///
/// # Errors
///
/// Returns an error if the path does not exist.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<NormalizedPath> {
    let path = path.as_ref();
    dunce::canonicalize(path)
        .map(NormalizedPath::new)
        .map_err(|e| Error::io(path, e))
}

fn clean(raw: &str) -> String {
    let (prefix, body) = if raw.starts_with("//") && !raw.starts_with("///") {
        ("//", &raw[2..])
    } else if raw.starts_with('/') {
        ("/", raw.trim_start_matches('/'))
    } else {
        ("", raw)
    };

    let segments: Vec<&str> = body
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let mut out = String::with_capacity(raw.len());
    out.push_str(prefix);
    out.push_str(&segments.join("/"));
    out
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}
