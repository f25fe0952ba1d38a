//! Filesystem layer for dirsync
//!
//! Provides canonical path handling, content hashing and the small set of
//! I/O primitives the sync engine needs (atomic writes, copy, remove).

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::ContentHash;
pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, canonicalize, split_relative};
