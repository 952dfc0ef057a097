//! Scoped cleanup for files the pipeline takes ownership of.
//!
//! The downloaded copy of a document must disappear when the render call
//! ends, whichever way it ends: success, unsupported type, rasterizer crash or
//! a panic unwinding through the task. Tying deletion to `Drop` gives that
//! for free. The rendering directory uses [`tempfile::TempDir`], which follows
//! the same rule.
//!
//! Deletion is best effort. A file that is already gone is fine; any other
//! failure is logged and dropped, never surfaced to the caller.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Deletes the file at `path` when dropped.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    /// Take ownership of an existing file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove {}: {}", self.path.display(), e),
        }
    }
}
