//! Optional persistence of the last snapshot across process restarts
//!
//! The strategy is chosen once at startup. Only the root and the per-file
//! hashes are stored; the tree hash is recomputed on load.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dirsync_fs::{ContentHash, NormalizedPath, RobustnessConfig, io};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::snapshot::Snapshot;
use crate::{Error, Result};

/// Current on-disk format version
pub const PERSIST_VERSION: u32 = 1;

/// On-disk form of a snapshot (JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    /// Format version for forward compatibility
    pub version: u32,
    /// Root directory the snapshot was taken from
    pub root: String,
    /// Relative path → content hash
    pub file_hashes: BTreeMap<String, ContentHash>,
    /// When the snapshot was written
    pub captured_at: DateTime<Utc>,
}

impl PersistedSnapshot {
    /// Capture a snapshot for writing.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            version: PERSIST_VERSION,
            root: NormalizedPath::new(snapshot.root()).as_str().to_string(),
            file_hashes: snapshot.file_hashes().clone(),
            captured_at: Utc::now(),
        }
    }

    /// Rebuild the in-memory snapshot, recomputing the tree hash.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot::from_hashes(PathBuf::from(self.root), self.file_hashes)
    }
}

/// Where (if anywhere) the previous snapshot lives between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Persistence {
    /// Keep state in memory only.
    #[default]
    None,
    /// Read and write a JSON file at this path.
    File(PathBuf),
}

impl Persistence {
    /// `File` when a path is given, `None` otherwise.
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::None, Self::File)
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::None => None,
            Self::File(path) => Some(path),
        }
    }

    /// Load the persisted snapshot.
    ///
    /// A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistLoad`] when the file exists but cannot be read,
    /// is not valid JSON, or has an unknown version.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let Self::File(path) = self else {
            return Ok(None);
        };

        let content = match io::read_text(&NormalizedPath::new(path)) {
            Ok(content) => content,
            Err(e) if e.io_kind() == Some(ErrorKind::NotFound) => {
                debug!(path = %path.display(), "no persisted snapshot");
                return Ok(None);
            }
            Err(e) => return Err(persist_load(path, e.to_string())),
        };

        let persisted: PersistedSnapshot =
            serde_json::from_str(&content).map_err(|e| persist_load(path, e.to_string()))?;

        if persisted.version != PERSIST_VERSION {
            return Err(persist_load(
                path,
                format!(
                    "unsupported version {} (expected {PERSIST_VERSION})",
                    persisted.version
                ),
            ));
        }

        debug!(
            path = %path.display(),
            files = persisted.file_hashes.len(),
            captured_at = %persisted.captured_at,
            "loaded persisted snapshot"
        );
        Ok(Some(persisted.into_snapshot()))
    }

    /// Persist `snapshot`. A no-op for [`Persistence::None`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let Self::File(path) = self else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&PersistedSnapshot::from_snapshot(snapshot))?;
        io::write_atomic(
            &NormalizedPath::new(path),
            content.as_bytes(),
            RobustnessConfig::default(),
        )?;

        debug!(path = %path.display(), files = snapshot.len(), "persisted snapshot");
        Ok(())
    }
}

fn persist_load(path: &Path, message: String) -> Error {
    Error::PersistLoad {
        path: path.to_path_buf(),
        message,
    }
}
