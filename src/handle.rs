//! Scoped working-copy handle.

use std::path::Path;

use crate::lock::WorkingCopyLock;
use crate::mutate::{self, LogEntry};
use crate::vcs::{GitError, WorkingCopy};

/// An opened working copy bound to a local path and a remote URI.
///
/// Holds an exclusive lock on the working copy for as long as it lives. It is
/// released exactly once, by [`RepoHandle::close`] or on drop, whichever
/// comes first.
pub struct RepoHandle<W: WorkingCopy> {
    working_copy: W,
    remote_uri: String,
    lock: Option<WorkingCopyLock>,
    released: bool,
}

impl<W: WorkingCopy> RepoHandle<W> {
    pub(crate) fn new(working_copy: W, remote_uri: &str, lock: WorkingCopyLock) -> Self {
        Self {
            working_copy,
            remote_uri: remote_uri.to_string(),
            lock: Some(lock),
            released: false,
        }
    }

    /// Root of the working copy.
    pub fn workdir(&self) -> &Path {
        self.working_copy.workdir()
    }

    pub fn remote_uri(&self) -> &str {
        &self.remote_uri
    }

    /// Lock file held by this handle, until it is released.
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock.as_ref().map(|lock| lock.path())
    }

    pub(crate) fn working_copy_mut(&mut self) -> &mut W {
        &mut self.working_copy
    }

    /// Overwrite `path` (relative to the working copy) with `content`.
    pub fn rewrite(&self, path: impl AsRef<Path>, content: &str) -> crate::Result<()> {
        mutate::rewrite(self.workdir(), path.as_ref(), content)
    }

    /// Prepend `entry` to `path` (relative to the working copy).
    pub fn prepend(&self, path: impl AsRef<Path>, entry: &LogEntry) -> crate::Result<()> {
        mutate::prepend(self.workdir(), path.as_ref(), entry)
    }

    /// Prepend `entry` to the working copy's `README.md`.
    pub fn prepend_readme(&self, entry: &LogEntry) -> crate::Result<()> {
        mutate::prepend_readme(self.workdir(), entry)
    }

    /// Release the working copy and its lock.
    pub fn close(mut self) -> Result<(), GitError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), GitError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let result = self.working_copy.close();
        self.lock = None;
        log::debug!("released working copy {}", self.workdir().display());
        result
    }
}

impl<W: WorkingCopy> Drop for RepoHandle<W> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!(
                "failed to release working copy {}: {}",
                self.workdir().display(),
                e
            );
        }
    }
}
