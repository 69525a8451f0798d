//! Keep a git working copy in sync with its remote, prepend dated entries to
//! a log-style file and push the result back.

mod acquire;
pub mod config;
mod error;
mod handle;
mod lock;
pub mod mutate;
mod publish;
pub mod settings;
mod sync;
#[cfg(test)]
mod test_harness;
pub mod vcs;

pub use acquire::acquire;
pub use config::{ConfigError, Credentials, SyncConfig, SyncConfigBuilder};
pub use error::{Error, PublishStep, Result, SyncOperation};
pub use handle::RepoHandle;
pub use mutate::{LogEntry, Mutation};
pub use publish::{Published, publish};
pub use sync::run;
pub use vcs::{Git2, GitError, VersionControl, WorkingCopy};
