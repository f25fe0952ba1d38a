//! Error types for dirsync-core

use std::path::PathBuf;

/// Result type for dirsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning, diffing, applying or persisting
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file or directory could not be read while building a snapshot.
    /// The whole scan is abandoned; no partial snapshot is produced.
    #[error("Scan failed at {path}: {source}")]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted snapshot was unreadable or malformed
    #[error("Could not load persisted snapshot from {path}: {message}")]
    PersistLoad { path: PathBuf, message: String },

    /// An upsert or remove handler failed for a path
    #[error("Handler failed for {path}: {source}")]
    Handler {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// The sync configuration is unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from dirsync-fs
    #[error(transparent)]
    Fs(#[from] dirsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn scan(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ScanIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn handler(path: &str, source: Error) -> Self {
        Self::Handler {
            path: path.to_string(),
            source: Box::new(source),
        }
    }

    /// Whether this error aborts the current cycle.
    ///
    /// Persistence load failures are recovered by the cycle driver; scan and
    /// handler failures end the cycle and leave the previous snapshot in place.
    pub fn is_cycle_fatal(&self) -> bool {
        !matches!(self, Self::PersistLoad { .. })
    }
}
