//! Acquire, mutate, publish.

use crate::acquire::acquire;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::mutate::Mutation;
use crate::publish::{Published, publish};
use crate::vcs::VersionControl;

/// Run one full sync: bring the working copy up to date, apply `mutations`
/// in order, publish the result, then release the working copy.
///
/// The working copy is released on every path. A failure after a mutation
/// leaves the working copy modified and uncommitted; running again re-stages
/// and re-commits.
pub fn run<V: VersionControl>(
    vcs: &V,
    config: &SyncConfig,
    mutations: &[Mutation],
) -> Result<Published> {
    let mut handle = acquire(vcs, config)?;

    for mutation in mutations {
        log::info!("updating {}", mutation.path().display());
        mutation.apply(handle.workdir())?;
    }

    let published = publish(&mut handle, config)?;

    if let Err(e) = handle.close() {
        log::warn!("failed to release working copy: {}", e);
    }
    Ok(published)
}
