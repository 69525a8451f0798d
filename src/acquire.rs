//! Repository acquisition: pull an existing working copy or clone a new one.

use std::fs;

use crate::config::SyncConfig;
use crate::error::{Error, Result, SyncOperation};
use crate::handle::RepoHandle;
use crate::lock::WorkingCopyLock;
use crate::vcs::{GitError, VersionControl, WorkingCopy};

/// Return a locked handle on an up-to-date working copy of the configured
/// remote and branch.
///
/// This will:
/// 1. Create the local path if missing
/// 2. Open and pull if the path already holds a repository
/// 3. Clone into it otherwise
///
/// Exactly one pull or one clone is attempted; nothing is retried.
pub fn acquire<V: VersionControl>(
    vcs: &V,
    config: &SyncConfig,
) -> Result<RepoHandle<V::WorkingCopy>> {
    let local_path = config.local_path();

    if !local_path.exists() {
        log::debug!("creating {}", local_path.display());
        fs::create_dir_all(local_path).map_err(|source| Error::PathCreation {
            path: local_path.to_path_buf(),
            source,
        })?;
    }
    if !local_path.is_dir() {
        return Err(Error::InvalidPath(local_path.to_path_buf()));
    }

    let credentials = config.credentials();
    let local = local_path.display().to_string();

    match vcs.open(local_path) {
        Ok(working_copy) => {
            let mut handle = lock_working_copy(working_copy, config)?;
            log::info!(
                "pulling {} from {} into {}",
                config.branch(),
                config.remote_uri(),
                local
            );
            handle
                .working_copy_mut()
                .pull(config.branch(), credentials.as_ref())
                .map_err(|e| Error::sync(SyncOperation::Pull, config.remote_uri(), e))?;
            Ok(handle)
        }
        Err(GitError::NotFound(_)) => {
            log::info!(
                "no repository at {}, cloning {} ({})",
                local,
                config.remote_uri(),
                config.branch()
            );
            let working_copy = vcs
                .clone_repo(
                    config.remote_uri(),
                    local_path,
                    config.branch(),
                    credentials.as_ref(),
                )
                .map_err(|e| Error::sync(SyncOperation::Clone, config.remote_uri(), e))?;
            lock_working_copy(working_copy, config)
        }
        Err(e) => Err(Error::sync(SyncOperation::Open, local, e)),
    }
}

fn lock_working_copy<W: WorkingCopy>(
    mut working_copy: W,
    config: &SyncConfig,
) -> Result<RepoHandle<W>> {
    let metadata_dir = working_copy.metadata_dir().to_path_buf();
    let target = config.local_path().display().to_string();

    let lock = match WorkingCopyLock::try_acquire(&metadata_dir) {
        Ok(Some(lock)) => lock,
        Ok(None) => {
            release_unlocked(&mut working_copy);
            return Err(Error::sync(
                SyncOperation::Lock,
                target,
                GitError::Locked(metadata_dir),
            ));
        }
        Err(e) => {
            release_unlocked(&mut working_copy);
            return Err(Error::sync(SyncOperation::Lock, target, GitError::Io(e)));
        }
    };

    log::debug!("locked {}", lock.path().display());
    Ok(RepoHandle::new(working_copy, config.remote_uri(), lock))
}

fn release_unlocked<W: WorkingCopy>(working_copy: &mut W) {
    if let Err(e) = working_copy.close() {
        log::warn!(
            "failed to close {}: {}",
            working_copy.workdir().display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::vcs::fake::{Call, FakeVcs};
    use std::path::Path;
    use tempfile::tempdir;

    fn config_for(path: &Path) -> SyncConfig {
        SyncConfig::builder()
            .local_path(path)
            .remote_uri("https://example.com/log.git")
            .build()
            .unwrap()
    }

    fn count(calls: &[Call], pred: impl Fn(&Call) -> bool) -> usize {
        calls.iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn clones_when_no_repository_exists() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("work");
        let config = SyncConfig::builder()
            .local_path(&local)
            .remote_uri("https://example.com/log.git")
            .branch("main")
            .username("alice")
            .password("token")
            .build()
            .unwrap();
        let vcs = FakeVcs::new();

        let handle = acquire(&vcs, &config).unwrap();
        assert_eq!(handle.workdir(), local);
        assert_eq!(handle.remote_uri(), "https://example.com/log.git");
        drop(handle);

        let calls = vcs.calls();
        assert_eq!(
            calls,
            vec![
                Call::Open(local.clone()),
                Call::Clone {
                    uri: "https://example.com/log.git".into(),
                    path: local.clone(),
                    branch: "main".into(),
                    credentials: Some(Credentials {
                        username: "alice".into(),
                        password: "token".into(),
                    }),
                },
                Call::Close,
            ]
        );
        assert_eq!(count(&calls, |c| matches!(c, Call::Pull { .. })), 0);
    }

    #[test]
    fn pulls_when_repository_exists() {
        let dir = tempdir().unwrap();
        FakeVcs::init(dir.path());
        let vcs = FakeVcs::new();

        let handle = acquire(&vcs, &config_for(dir.path())).unwrap();
        drop(handle);

        let calls = vcs.calls();
        assert_eq!(count(&calls, |c| matches!(c, Call::Clone { .. })), 0);
        assert_eq!(
            count(&calls, |c| *c
                == Call::Pull {
                    branch: "master".into(),
                    credentials: None,
                }),
            1
        );
    }

    #[test]
    fn creates_missing_local_path() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("a").join("b").join("c");

        acquire(&FakeVcs::new(), &config_for(&local)).unwrap();

        assert!(local.is_dir());
    }

    #[test]
    fn rejects_file_as_local_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain-file");
        fs::write(&file, "not a directory").unwrap();
        let vcs = FakeVcs::new();

        let result = acquire(&vcs, &config_for(&file));

        assert!(matches!(result, Err(Error::InvalidPath(ref p)) if *p == file));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn path_creation_failure_is_reported() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain-file");
        fs::write(&file, "x").unwrap();

        let result = acquire(&FakeVcs::new(), &config_for(&file.join("child")));

        assert!(matches!(result, Err(Error::PathCreation { .. })));
    }

    #[test]
    fn other_open_errors_do_not_fall_back_to_clone() {
        let dir = tempdir().unwrap();
        let vcs = FakeVcs::new().fail_on("open");

        let result = acquire(&vcs, &config_for(dir.path()));

        assert!(matches!(
            result,
            Err(Error::Sync {
                operation: SyncOperation::Open,
                ..
            })
        ));
        assert_eq!(vcs.calls(), vec![Call::Open(dir.path().to_path_buf())]);
    }

    #[test]
    fn clone_failure_is_a_sync_error() {
        let dir = tempdir().unwrap();
        let vcs = FakeVcs::new().fail_on("clone");

        let result = acquire(&vcs, &config_for(dir.path()));

        assert!(matches!(
            result,
            Err(Error::Sync {
                operation: SyncOperation::Clone,
                ..
            })
        ));
    }

    #[test]
    fn pull_failure_is_a_sync_error_and_releases_handle() {
        let dir = tempdir().unwrap();
        FakeVcs::init(dir.path());
        let vcs = FakeVcs::new().fail_on("pull");

        let result = acquire(&vcs, &config_for(dir.path()));

        assert!(matches!(
            result,
            Err(Error::Sync {
                operation: SyncOperation::Pull,
                ..
            })
        ));
        assert_eq!(vcs.calls().last(), Some(&Call::Close));
    }

    #[test]
    fn second_handle_on_same_path_is_refused() {
        let dir = tempdir().unwrap();
        FakeVcs::init(dir.path());
        let vcs = FakeVcs::new();
        let config = config_for(dir.path());

        let first = acquire(&vcs, &config).unwrap();
        let second = acquire(&vcs, &config);
        assert!(matches!(
            second,
            Err(Error::Sync {
                operation: SyncOperation::Lock,
                source: GitError::Locked(_),
                ..
            })
        ));

        drop(first);
        assert!(acquire(&vcs, &config).is_ok());
    }
}
