use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::vcs::GitError;

/// Which part of acquiring a working copy failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Open,
    Clone,
    Pull,
    Lock,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncOperation::Open => "open",
            SyncOperation::Clone => "clone",
            SyncOperation::Pull => "pull",
            SyncOperation::Lock => "lock",
        };
        f.write_str(name)
    }
}

/// Which publishing step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Stage,
    Commit,
    Push,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::Stage => "stage",
            PublishStep::Commit => "commit",
            PublishStep::Push => "push",
        };
        f.write_str(name)
    }
}

/// Errors returned by sync, mutation and publish operations.
///
/// Every variant is fatal; the whole run has to be repeated once the cause is
/// fixed.
#[derive(Error, Debug)]
pub enum Error {
    /// Mandatory configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// The local path did not exist and could not be created.
    #[error("failed to create local path {}: {source}", .path.display())]
    PathCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The local path exists but is not a directory.
    #[error("local path is not a directory: {}", .0.display())]
    InvalidPath(PathBuf),
    /// Opening, cloning or pulling the repository failed.
    #[error("{operation} of {target} failed: {source}")]
    Sync {
        operation: SyncOperation,
        target: String,
        #[source]
        source: GitError,
    },
    /// A file inside the working copy could not be rewritten.
    #[error("failed to mutate {}: {source}", .path.display())]
    Mutation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The temporary copy made during a prepend could not be deleted.
    #[error("failed to delete temporary file {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Staging, committing or pushing failed.
    #[error("{step} failed: {source}")]
    Publish {
        step: PublishStep,
        #[source]
        source: GitError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn sync(
        operation: SyncOperation,
        target: impl Into<String>,
        source: GitError,
    ) -> Self {
        Error::Sync {
            operation,
            target: target.into(),
            source,
        }
    }

    pub(crate) fn mutation(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Mutation {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn publish(step: PublishStep, source: GitError) -> Self {
        Error::Publish { step, source }
    }
}
