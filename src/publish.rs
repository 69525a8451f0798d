//! Stage, commit and push a working copy.

use crate::config::SyncConfig;
use crate::error::{Error, PublishStep, Result};
use crate::handle::RepoHandle;
use crate::vcs::WorkingCopy;

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Id of the commit now at the tip of the remote branch.
    pub commit: String,
    pub branch: String,
}

/// Stage every change, commit it with the configured message and push the
/// configured branch.
///
/// Steps run strictly in order and stop at the first failure; a failed
/// commit is never followed by a push.
pub fn publish<W: WorkingCopy>(
    handle: &mut RepoHandle<W>,
    config: &SyncConfig,
) -> Result<Published> {
    let credentials = config.credentials();
    let working_copy = handle.working_copy_mut();

    working_copy
        .stage_all()
        .map_err(|e| Error::publish(PublishStep::Stage, e))?;

    let commit = working_copy
        .commit(config.commit_message())
        .map_err(|e| Error::publish(PublishStep::Commit, e))?;
    log::info!("committed {}: {}", commit, config.commit_message());

    working_copy
        .push(config.branch(), credentials.as_ref())
        .map_err(|e| Error::publish(PublishStep::Push, e))?;
    log::info!("pushed {} to {}", config.branch(), config.remote_uri());

    Ok(Published {
        commit,
        branch: config.branch().to_string(),
    })
}
