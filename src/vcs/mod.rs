//! Version-control collaborator.
//!
//! The acquirer and publisher only talk to git through [`VersionControl`] and
//! [`WorkingCopy`]. The production implementation is [`Git2`], backed by
//! libgit2.

#[cfg(test)]
pub(crate) mod fake;
mod git;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Credentials;

pub use git::{Git2, Git2WorkingCopy};

/// Errors returned by git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// libgit2 reported an error.
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
    /// Path does not contain repository metadata.
    #[error("repository not found at {}", .0.display())]
    NotFound(PathBuf),
    /// Local and remote histories have diverged; a fast-forward is impossible.
    #[error("branch '{0}' has diverged from the remote")]
    Diverged(String),
    /// The remote refused a reference update.
    #[error("push rejected for {reference}: {message}")]
    PushRejected { reference: String, message: String },
    /// Another handle already holds the working copy.
    #[error("working copy is locked by another process: {}", .0.display())]
    Locked(PathBuf),
    /// Invalid inputs were provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Underlying IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens or clones working copies.
pub trait VersionControl {
    type WorkingCopy: WorkingCopy;

    /// Open an existing working copy.
    ///
    /// Must return [`GitError::NotFound`] when `path` holds no repository
    /// metadata, and a different variant for every other failure.
    fn open(&self, path: &Path) -> Result<Self::WorkingCopy, GitError>;

    /// Clone `uri` into `path` and check out `branch`.
    fn clone_repo(
        &self,
        uri: &str,
        path: &Path,
        branch: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Self::WorkingCopy, GitError>;
}

/// An opened working copy.
pub trait WorkingCopy {
    /// Root of the checked-out tree.
    fn workdir(&self) -> &Path;

    /// Directory holding repository metadata (`.git`).
    fn metadata_dir(&self) -> &Path;

    /// Fetch `branch` from origin and fast-forward onto it.
    fn pull(&mut self, branch: &str, credentials: Option<&Credentials>) -> Result<(), GitError>;

    /// Stage every new, modified and deleted file.
    fn stage_all(&mut self) -> Result<(), GitError>;

    /// Commit the index, returning the new commit id.
    fn commit(&mut self, message: &str) -> Result<String, GitError>;

    /// Push `branch` to origin.
    fn push(&mut self, branch: &str, credentials: Option<&Credentials>) -> Result<(), GitError>;

    /// Release any resources held on the repository.
    fn close(&mut self) -> Result<(), GitError> {
        Ok(())
    }
}
