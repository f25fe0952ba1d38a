//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;
use tracing::debug;

use crate::{Error, NormalizedPath, Result};

/// First wait between lock attempts; later waits grow up to [`LOCK_RETRY_MAX`].
const LOCK_RETRY_INITIAL: Duration = Duration::from_millis(10);
const LOCK_RETRY_MAX: Duration = Duration::from_millis(250);

/// Tuning knobs for atomic writes.
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// How long to keep retrying the exclusive lock before giving up.
    pub lock_timeout: Duration,
    /// Whether to `fsync` the temp file before the rename.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    // Ensure parent directory exists
    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(&native_path);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    lock_with_timeout(&temp_file, config.lock_timeout).map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| {
            if config.enable_fsync {
                temp_file.sync_all()
            } else {
                Ok(())
            }
        })
        .map_err(|e| Error::io(&temp_path, e));

    let unlocked = FileExt::unlock(&temp_file).map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    });
    drop(temp_file);

    if let Err(e) = written.and(unlocked) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, &native_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(&native_path, e)
    })?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Copy `source` into `target_dir`, keeping its file name.
///
/// Creates `target_dir` if needed and replaces any existing file of the same
/// name. The copy lands in a temp sibling first and is renamed into place, so
/// readers of the target never observe a half-written file.
///
/// Returns the path of the written file.
pub fn copy_into(source: &Path, target_dir: &Path) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        Error::io(
            source,
            std::io::Error::new(ErrorKind::InvalidInput, "source has no file name"),
        )
    })?;

    fs::create_dir_all(target_dir).map_err(|e| Error::io(target_dir, e))?;

    let destination = target_dir.join(file_name);
    let temp_path = temp_sibling(&destination);

    fs::copy(source, &temp_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(source, e)
    })?;
    fs::rename(&temp_path, &destination).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(&destination, e)
    })?;

    debug!(source = %source.display(), destination = %destination.display(), "copied file");
    Ok(destination)
}

/// Remove `file_name` from `target_dir`.
///
/// An already-absent file is not an error. Returns whether a file was removed.
pub fn remove_from(target_dir: &Path, file_name: &str) -> Result<bool> {
    let path = target_dir.join(file_name);
    match fs::remove_file(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed file");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "file already absent");
            Ok(false)
        }
        Err(e) => Err(Error::io(&path, e)),
    }
}

/// Remove `dir` and then each parent while they are empty, stopping at
/// (and never removing) `stop_at`.
///
/// Does nothing unless `dir` lies strictly under `stop_at`. Directories that
/// are already gone are skipped. Returns the number of directories removed.
pub fn prune_empty_dirs(dir: &Path, stop_at: &Path) -> Result<usize> {
    let mut removed = 0;
    let mut current = dir;

    while current != stop_at && current.starts_with(stop_at) {
        match fs::remove_dir(current) {
            Ok(()) => {
                debug!(path = %current.display(), "pruned empty directory");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => break,
            Err(e) => return Err(Error::io(current, e)),
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Ok(removed)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    path.with_file_name(temp_name)
}

/// Retry a non-blocking exclusive lock with exponential backoff until
/// `timeout` has elapsed. Only contention is retried.
fn lock_with_timeout(file: &fs::File, timeout: Duration) -> std::io::Result<()> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(LOCK_RETRY_INITIAL)
        .with_max_interval(LOCK_RETRY_MAX)
        .with_max_elapsed_time(Some(timeout))
        .build();
    let contended = fs2::lock_contended_error().raw_os_error();

    backoff::retry(policy, || match file.try_lock_exclusive() {
        Err(e) if e.raw_os_error() == contended => {
            debug!(error = %e, "lock contended, retrying");
            Err(backoff::Error::transient(e))
        }
        other => other.map_err(backoff::Error::permanent),
    })
    .map_err(|e| match e {
        backoff::Error::Permanent(e) | backoff::Error::Transient { err: e, .. } => e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_into_creates_missing_target_dir() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, "hi").unwrap();

        let target_dir = temp.path().join("out").join("sub");
        let written = copy_into(&source, &target_dir).unwrap();

        assert_eq!(written, target_dir.join("a.txt"));
        assert_eq!(fs::read_to_string(written).unwrap(), "hi");
    }

    #[test]
    fn copy_into_overwrites_existing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, "new").unwrap();
        let target_dir = temp.path().join("out");
        fs::create_dir_all(&target_dir).unwrap();
        fs::write(target_dir.join("a.txt"), "old").unwrap();

        copy_into(&source, &target_dir).unwrap();

        assert_eq!(fs::read_to_string(target_dir.join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn copy_into_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, "x").unwrap();
        let target_dir = temp.path().join("out");

        copy_into(&source, &target_dir).unwrap();

        let leftovers: Vec<_> = fs::read_dir(&target_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn copy_into_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let result = copy_into(&temp.path().join("nope.txt"), temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn remove_from_tolerates_absent_file() {
        let temp = TempDir::new().unwrap();
        assert!(!remove_from(temp.path(), "ghost.txt").unwrap());
    }

    #[test]
    fn remove_from_deletes_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "x").unwrap();

        assert!(remove_from(temp.path(), "a.txt").unwrap());
        assert!(!temp.path().join("a.txt").exists());
    }
}
