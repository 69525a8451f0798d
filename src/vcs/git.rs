//! libgit2-backed version control.
//!
//! All operations go through `git2`:
//! - `open` / `clone_repo` - open an existing working copy or clone a new one
//! - `pull` - fetch one branch and fast-forward onto it
//! - `stage_all` / `commit` / `push` - publish local changes
//!
//! Network transports depend on the `https` and `ssh` cargo features; local
//! paths and `file://` remotes always work.

use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Commit, Cred, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions, RemoteCallbacks,
    Repository, Signature,
};

use super::{GitError, VersionControl, WorkingCopy};
use crate::config::Credentials;

const REMOTE: &str = "origin";
const FALLBACK_NAME: &str = "gitjot";
const FALLBACK_EMAIL: &str = "gitjot@localhost";

/// [`VersionControl`] implemented with libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2;

impl VersionControl for Git2 {
    type WorkingCopy = Git2WorkingCopy;

    fn open(&self, path: &Path) -> Result<Git2WorkingCopy, GitError> {
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::NotFound(path.to_path_buf())
            } else {
                GitError::Git(e)
            }
        })?;
        Git2WorkingCopy::from_repository(repo)
    }

    fn clone_repo(
        &self,
        uri: &str,
        path: &Path,
        branch: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Git2WorkingCopy, GitError> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(credentials));

        let repo = RepoBuilder::new()
            .branch(branch)
            .fetch_options(fetch_options)
            .clone(uri, path)?;
        Git2WorkingCopy::from_repository(repo)
    }
}

/// A non-bare repository opened through libgit2.
pub struct Git2WorkingCopy {
    repo: Repository,
    workdir: PathBuf,
    git_dir: PathBuf,
}

impl Git2WorkingCopy {
    fn from_repository(repo: Repository) -> Result<Self, GitError> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| {
                GitError::InvalidInput(format!(
                    "{} is a bare repository",
                    repo.path().display()
                ))
            })?
            .to_path_buf();
        let git_dir = repo.path().to_path_buf();
        Ok(Self {
            repo,
            workdir,
            git_dir,
        })
    }

    /// Access the underlying libgit2 repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Check out `target` safely, then point `refname` and HEAD at it.
    ///
    /// The tree is checked out before the ref moves so the checkout baseline
    /// is still the old HEAD; local edits that would be clobbered make the
    /// checkout fail instead of being overwritten.
    fn check_out(&self, refname: &str, target: Oid) -> Result<(), GitError> {
        let commit = self.repo.find_commit(target)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))?;
        self.repo
            .reference(refname, target, true, "gitjot: fast-forward")?;
        self.repo.set_head(refname)?;
        Ok(())
    }

    fn head_is(&self, refname: &str) -> bool {
        match self.repo.head() {
            Ok(head) => head.name() == Some(refname),
            Err(_) => false,
        }
    }

    fn signature(&self) -> Result<Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            Err(e) => {
                log::debug!("no configured git identity ({}), using fallback", e.message());
                Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?)
            }
        }
    }
}

impl WorkingCopy for Git2WorkingCopy {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn metadata_dir(&self) -> &Path {
        &self.git_dir
    }

    fn pull(&mut self, branch: &str, credentials: Option<&Credentials>) -> Result<(), GitError> {
        let tracking = format!("refs/remotes/{REMOTE}/{branch}");
        let refspec = format!("+refs/heads/{branch}:{tracking}");

        {
            let mut remote = self.repo.find_remote(REMOTE)?;
            let mut fetch_options = FetchOptions::new();
            fetch_options.remote_callbacks(remote_callbacks(credentials));
            remote.fetch(&[refspec.as_str()], Some(&mut fetch_options), None)?;
        }

        let fetched = self.repo.refname_to_id(&tracking)?;
        let local_ref = format!("refs/heads/{branch}");

        let local = match self.repo.refname_to_id(&local_ref) {
            Ok(oid) => Some(oid),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        match local {
            None => {
                log::debug!("{local_ref} is unborn, checking out {fetched}");
                self.check_out(&local_ref, fetched)
            }
            Some(local) if local == fetched || self.repo.graph_descendant_of(local, fetched)? => {
                log::debug!("{local_ref} is up to date with {tracking}");
                if self.head_is(&local_ref) {
                    Ok(())
                } else {
                    self.check_out(&local_ref, local)
                }
            }
            Some(local) if self.repo.graph_descendant_of(fetched, local)? => {
                log::info!("fast-forwarding {local_ref} {local}..{fetched}");
                self.check_out(&local_ref, fetched)
            }
            Some(_) => Err(GitError::Diverged(branch.to_string())),
        }
    }

    fn stage_all(&mut self) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<String, GitError> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                log::info!("nothing to commit, HEAD stays at {}", parent.id());
                return Ok(parent.id().to_string());
            }
        }

        let signature = self.signature()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        Ok(oid.to_string())
    }

    fn push(&mut self, branch: &str, credentials: Option<&Credentials>) -> Result<(), GitError> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut remote = self.repo.find_remote(REMOTE)?;
        let mut rejection: Option<(String, String)> = None;

        {
            let mut callbacks = remote_callbacks(credentials);
            callbacks.push_update_reference(|reference, status| {
                if let Some(message) = status {
                    rejection = Some((reference.to_string(), message.to_string()));
                }
                Ok(())
            });
            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut push_options))?;
        }

        match rejection {
            Some((reference, message)) => Err(GitError::PushRejected { reference, message }),
            None => Ok(()),
        }
    }
}

/// Build remote callbacks that answer a username/password challenge once.
///
/// libgit2 keeps invoking the credentials callback while the server rejects
/// them, so a second invocation is reported as an authentication failure.
fn remote_callbacks(credentials: Option<&Credentials>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(credentials) = credentials {
        let mut attempts = 0u32;
        callbacks.credentials(move |url, _username_from_url, allowed| {
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::from_str(&format!(
                    "authentication failed for {url}"
                )));
            }
            if !allowed.is_user_pass_plaintext() {
                return Err(git2::Error::from_str(&format!(
                    "{url} does not accept username/password credentials"
                )));
            }
            Cred::userpass_plaintext(&credentials.username, &credentials.password)
        });
    }
    callbacks
}
