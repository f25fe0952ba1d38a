//! Sync configuration
//!
//! A [`SyncConfig`] can be assembled in code or read from a TOML, JSON or
//! YAML file through [`ConfigStore`]:
//!
//! ```toml
//! source = "/data/inbox"
//! target = "/data/mirror"
//! interval_ms = 2000
//! state_file = "/var/lib/dirsync/state.json"
//! baseline = "all-new"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use dirsync_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::persist::Persistence;
use crate::{Error, Result};

/// Default poll interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// What the first cycle does when there is no previous snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselinePolicy {
    /// The current tree becomes the baseline; nothing is copied.
    #[default]
    Unchanged,
    /// Every file in the current tree is treated as new.
    AllNew,
}

impl std::str::FromStr for BaselinePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unchanged" => Ok(Self::Unchanged),
            "all-new" => Ok(Self::AllNew),
            other => Err(Error::InvalidConfig {
                message: format!("unknown baseline policy '{other}' (expected unchanged or all-new)"),
            }),
        }
    }
}

impl std::fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "unchanged",
            Self::AllNew => "all-new",
        })
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL.as_millis() as u64
}

/// File form of the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub baseline: BaselinePolicy,
}

/// Resolved configuration for a sync loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Directory to watch
    pub source: PathBuf,
    /// Directory to mirror into
    pub target: PathBuf,
    /// Wait between cycles
    pub interval: Duration,
    /// Where the previous snapshot is kept
    pub persistence: Persistence,
    /// First-run behaviour
    pub baseline: BaselinePolicy,
}

impl SyncConfig {
    /// Configuration with default interval, no persistence and an
    /// `Unchanged` baseline.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            interval: DEFAULT_INTERVAL,
            persistence: Persistence::None,
            baseline: BaselinePolicy::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_baseline(mut self, baseline: BaselinePolicy) -> Self {
        self.baseline = baseline;
        self
    }

    /// Load and validate a configuration file.
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let file: ConfigFile = ConfigStore::new().load(&NormalizedPath::new(path))?;
        let base = path.parent().unwrap_or(Path::new("."));
        let config = Self::from_file(file, base);
        config.validate()?;
        Ok(config)
    }

    /// Convert the file form, resolving relative paths against `base`.
    pub fn from_file(file: ConfigFile, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        Self {
            source: resolve(file.source),
            target: resolve(file.target),
            interval: Duration::from_millis(file.interval_ms),
            persistence: Persistence::from_option(file.state_file.map(resolve)),
            baseline: file.baseline,
        }
    }

    /// The file form of this configuration.
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            source: self.source.clone(),
            target: self.target.clone(),
            interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            state_file: self.persistence.path().map(Path::to_path_buf),
            baseline: self.baseline,
        }
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the source is not a directory, the
    /// interval is zero, or the target or state file lies inside the source.
    pub fn validate(&self) -> Result<()> {
        if !self.source.is_dir() {
            return Err(invalid(format!(
                "source {} is not a directory",
                self.source.display()
            )));
        }
        if self.interval.is_zero() {
            return Err(invalid("interval must be greater than zero".into()));
        }

        let source = dirsync_fs::canonicalize(&self.source)?;
        let target = absolute_lexical(&self.target);
        if target.starts_with(&source) {
            return Err(invalid(format!(
                "target {} lies inside source {}",
                self.target.display(),
                self.source.display()
            )));
        }
        if let Some(state) = self.persistence.path()
            && absolute_lexical(state).starts_with(&source)
        {
            return Err(invalid(format!(
                "state file {} lies inside source {}",
                state.display(),
                self.source.display()
            )));
        }
        Ok(())
    }
}

/// Canonical form of `path` if it exists, otherwise its canonical parent
/// joined with the remaining components.
fn absolute_lexical(path: &Path) -> NormalizedPath {
    if let Ok(canonical) = dirsync_fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            absolute_lexical(parent).join(&name.to_string_lossy())
        }
        _ => std::env::current_dir()
            .map(|cwd| NormalizedPath::new(cwd.join(path)))
            .unwrap_or_else(|_| NormalizedPath::new(path)),
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig { message }
}
