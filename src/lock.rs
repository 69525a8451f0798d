use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Lock file name inside the repository metadata directory.
pub const LOCK_FILE: &str = "gitjot.lock";

/// A guard that holds an exclusive advisory lock on a working copy.
/// Lock is released when dropped.
#[derive(Debug)]
pub struct WorkingCopyLock {
    file: File,
    path: PathBuf,
}

impl WorkingCopyLock {
    /// Try to lock the working copy whose metadata lives in `metadata_dir`,
    /// without blocking.
    /// Returns None if the lock is held by another handle or process.
    pub fn try_acquire(metadata_dir: &Path) -> io::Result<Option<Self>> {
        let path = metadata_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkingCopyLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
