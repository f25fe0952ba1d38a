//! Polling directory synchronization engine
//!
//! Detects new, changed and removed files in a source tree by comparing
//! content-hash snapshots across scans, and mirrors those changes into a
//! target directory through pluggable handlers.
//!
//! # Architecture
//!
//! ```text
//!   CycleDriver ──► Snapshot::build ──► diff ──► apply ──► Persistence
//!        ▲                                                    │
//!        └──────────────── CycleState (previous) ◄────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dirsync_core::{DefaultHandler, Snapshot, SyncOptions, apply, diff};
//!
//! fn example() -> dirsync_core::Result<()> {
//!     let before = Snapshot::build("inbox")?;
//!     // ... files change ...
//!     let after = Snapshot::build("inbox")?;
//!
//!     let changes = diff(&before, &after);
//!     apply(&after, "mirror".as_ref(), &changes, &DefaultHandler, SyncOptions::default())?;
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod config;
pub mod cycle;
pub mod diff;
pub mod error;
pub mod persist;
pub mod snapshot;

pub use apply::{
    ApplyAction, ApplyReport, DefaultHandler, FnHandler, SyncHandler, SyncOptions, apply,
    target_subdir,
};
pub use config::{BaselinePolicy, ConfigFile, SyncConfig};
pub use cycle::{CycleDriver, CycleReport, CycleState, RunSummary, run_cycle};
pub use diff::{DiffResult, diff};
pub use error::{Error, Result};
pub use persist::{PersistedSnapshot, Persistence};
pub use snapshot::Snapshot;
