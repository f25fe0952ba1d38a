//! Shared test utilities for the dirsync workspace.
//!
//! Fixtures used by the crate test suites and the integration package.
//! Dev-dependency only; never published.
//!
//! # Modules
//!
//! - [`tree`]: [`tree::TestTree`], a paired source/target directory fixture

pub mod tree;
