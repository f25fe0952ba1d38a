//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use dirsync_core::BaselinePolicy;

/// dirsync - Mirror a directory by polling it for changes
#[derive(Parser, Debug)]
#[command(name = "dirsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Source, target and loop settings shared by `watch` and `once`.
///
/// Flags override values read from `--config`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    /// Directory to watch
    #[arg(required_unless_present = "config")]
    pub source: Option<PathBuf>,

    /// Directory to mirror into
    #[arg(required_unless_present = "config")]
    pub target: Option<PathBuf>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Milliseconds between cycles
    #[arg(long, value_name = "N")]
    pub interval_ms: Option<u64>,

    /// Persist the last snapshot to this file
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// First-run behaviour without a previous snapshot (unchanged or all-new)
    #[arg(long, value_name = "POLICY")]
    pub baseline: Option<BaselinePolicy>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll SOURCE and mirror changes into TARGET until interrupted
    ///
    /// Examples:
    ///   dirsync watch ./inbox ./mirror
    ///   dirsync watch ./inbox ./mirror --state sync.json --baseline all-new
    ///   dirsync watch --config dirsync.toml
    Watch {
        #[command(flatten)]
        sync: SyncArgs,

        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        max_cycles: Option<u64>,
    },

    /// Run a single sync cycle and print what it did
    Once {
        #[command(flatten)]
        sync: SyncArgs,

        /// Preview actions without touching the target
        #[arg(long)]
        dry_run: bool,
    },

    /// Show pending changes against a persisted snapshot
    Diff {
        /// Directory to scan
        source: PathBuf,

        /// Persisted snapshot to compare against
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Scan a directory and print its file count and tree hash
    Snapshot {
        /// Directory to scan
        source: PathBuf,

        /// Persist the snapshot to this file
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   dirsync completions bash > ~/.local/share/bash-completion/completions/dirsync
    ///   dirsync completions zsh > ~/.zfunc/_dirsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
