//! Pluggable upsert/remove handlers
//!
//! The applier never touches the target directly; it calls a [`SyncHandler`]
//! once per affected path with the resolved source path and the target
//! subdirectory the file belongs in.

use std::path::Path;

use dirsync_fs::io;

use crate::Result;

/// Capability set invoked by the sync applier.
///
/// `on_changed` falls back to `on_new`, so a handler that treats both cases
/// alike only implements two methods. Override it to split the behaviour.
pub trait SyncHandler: Send + Sync {
    /// A file appeared in the source.
    fn on_new(&self, source: &Path, target_dir: &Path) -> Result<()>;

    /// A file's content changed in the source.
    fn on_changed(&self, source: &Path, target_dir: &Path) -> Result<()> {
        self.on_new(source, target_dir)
    }

    /// A file disappeared from the source.
    ///
    /// `source` no longer exists; only its file name is meaningful. Removing
    /// something already absent from the target must succeed.
    fn on_remove(&self, source: &Path, target_dir: &Path) -> Result<()>;

    /// Called after a successful removal with the subdirectory the file was
    /// removed from and the target root.
    ///
    /// Lets handlers that own a real directory tree drop subdirectories the
    /// removal left empty, so a path can later be reused as a file. The
    /// default does nothing.
    fn prune(&self, _target_dir: &Path, _target_root: &Path) -> Result<()> {
        Ok(())
    }
}

/// Copy on upsert, delete by file name on remove, prune emptied directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl SyncHandler for DefaultHandler {
    fn on_new(&self, source: &Path, target_dir: &Path) -> Result<()> {
        io::copy_into(source, target_dir)?;
        Ok(())
    }

    fn on_remove(&self, source: &Path, target_dir: &Path) -> Result<()> {
        // Name only: the source file is gone, so it must not be stat'ed.
        let Some(name) = source.file_name() else {
            return Ok(());
        };
        io::remove_from(target_dir, &name.to_string_lossy())?;
        Ok(())
    }

    fn prune(&self, target_dir: &Path, target_root: &Path) -> Result<()> {
        io::prune_empty_dirs(target_dir, target_root)?;
        Ok(())
    }
}

type HandlerFn = Box<dyn Fn(&Path, &Path) -> Result<()> + Send + Sync>;

/// A handler assembled from closures.
///
/// ```
/// use dirsync_core::apply::FnHandler;
///
/// let handler = FnHandler::new(
///     |src, dir| { println!("upsert {} -> {}", src.display(), dir.display()); Ok(()) },
///     |src, dir| { println!("remove {} from {}", src.display(), dir.display()); Ok(()) },
/// );
/// # let _ = handler;
/// ```
pub struct FnHandler {
    upsert: HandlerFn,
    changed: Option<HandlerFn>,
    remove: HandlerFn,
}

impl FnHandler {
    /// One closure for new and changed files, one for removals.
    pub fn new<U, R>(upsert: U, remove: R) -> Self
    where
        U: Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
        R: Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            upsert: Box::new(upsert),
            changed: None,
            remove: Box::new(remove),
        }
    }

    /// Use a separate closure for changed files.
    pub fn with_changed<C>(mut self, changed: C) -> Self
    where
        C: Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
    {
        self.changed = Some(Box::new(changed));
        self
    }
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("split_changed", &self.changed.is_some())
            .finish_non_exhaustive()
    }
}

impl SyncHandler for FnHandler {
    fn on_new(&self, source: &Path, target_dir: &Path) -> Result<()> {
        (self.upsert)(source, target_dir)
    }

    fn on_changed(&self, source: &Path, target_dir: &Path) -> Result<()> {
        match &self.changed {
            Some(changed) => changed(source, target_dir),
            None => (self.upsert)(source, target_dir),
        }
    }

    fn on_remove(&self, source: &Path, target_dir: &Path) -> Result<()> {
        (self.remove)(source, target_dir)
    }
}
