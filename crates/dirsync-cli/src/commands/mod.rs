//! Command implementations for dirsync-cli

pub mod diff;
pub mod once;
pub mod snapshot;
pub mod watch;

pub use diff::run_diff;
pub use once::run_once;
pub use snapshot::run_snapshot;
pub use watch::run_watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use dirsync_core::{ConfigFile, Persistence, SyncConfig};
use dirsync_fs::{ConfigStore, NormalizedPath};

use crate::cli::SyncArgs;
use crate::error::{CliError, Result};

/// Resolve the effective configuration: the `--config` file if given, then
/// command-line overrides, then validation.
///
/// The source is canonicalized so persisted snapshots match across runs
/// started from different working directories.
pub fn build_config(args: &SyncArgs) -> Result<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file: ConfigFile = ConfigStore::new().load(&NormalizedPath::new(path))?;
            SyncConfig::from_file(file, path.parent().unwrap_or(Path::new(".")))
        }
        None => {
            let (Some(source), Some(target)) = (&args.source, &args.target) else {
                return Err(CliError::user(
                    "SOURCE and TARGET are required unless --config is given",
                ));
            };
            SyncConfig::new(source, target)
        }
    };

    if let Some(source) = &args.source {
        config.source = source.clone();
    }
    if let Some(target) = &args.target {
        config.target = target.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.interval = Duration::from_millis(ms);
    }
    if let Some(state) = &args.state {
        config.persistence = Persistence::File(state.clone());
    }
    if let Some(baseline) = args.baseline {
        config.baseline = baseline;
    }

    config.validate()?;
    config.source = canonical_dir(&config.source)?;
    Ok(config)
}

/// Canonical native form of an existing directory.
pub fn canonical_dir(path: &Path) -> Result<PathBuf> {
    Ok(dirsync_fs::canonicalize(path)?.to_native())
}
