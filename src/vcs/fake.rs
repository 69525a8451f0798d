//! Recording stand-in for git used by unit tests.
//!
//! A directory counts as a working copy when it contains a `.fakegit`
//! directory; cloning creates it. Every call is recorded in order and any
//! operation can be made to fail.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{GitError, VersionControl, WorkingCopy};
use crate::config::Credentials;

const MARKER: &str = ".fakegit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Open(PathBuf),
    Clone {
        uri: String,
        path: PathBuf,
        branch: String,
        credentials: Option<Credentials>,
    },
    Pull {
        branch: String,
        credentials: Option<Credentials>,
    },
    StageAll,
    Commit(String),
    Push {
        branch: String,
        credentials: Option<Credentials>,
    },
    Close,
}

#[derive(Clone, Default)]
pub(crate) struct FakeVcs {
    calls: Rc<RefCell<Vec<Call>>>,
    failing: Rc<RefCell<Vec<&'static str>>>,
}

impl FakeVcs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make the named operation (`open`, `clone`, `pull`, `stage`, `commit`,
    /// `push`, `close`) fail.
    pub(crate) fn fail_on(self, operation: &'static str) -> Self {
        self.failing.borrow_mut().push(operation);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Mark `path` as an existing working copy.
    pub(crate) fn init(path: &Path) {
        fs::create_dir_all(path.join(MARKER)).unwrap();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, operation: &'static str) -> Result<(), GitError> {
        if self.failing.borrow().contains(&operation) {
            Err(GitError::InvalidInput(format!("injected {operation} failure")))
        } else {
            Ok(())
        }
    }

    fn working_copy(&self, path: &Path) -> FakeWorkingCopy {
        FakeWorkingCopy {
            vcs: self.clone(),
            workdir: path.to_path_buf(),
            metadata_dir: path.join(MARKER),
            commits: 0,
        }
    }
}

impl VersionControl for FakeVcs {
    type WorkingCopy = FakeWorkingCopy;

    fn open(&self, path: &Path) -> Result<FakeWorkingCopy, GitError> {
        self.record(Call::Open(path.to_path_buf()));
        self.check("open")?;
        if !path.join(MARKER).is_dir() {
            return Err(GitError::NotFound(path.to_path_buf()));
        }
        Ok(self.working_copy(path))
    }

    fn clone_repo(
        &self,
        uri: &str,
        path: &Path,
        branch: &str,
        credentials: Option<&Credentials>,
    ) -> Result<FakeWorkingCopy, GitError> {
        self.record(Call::Clone {
            uri: uri.to_string(),
            path: path.to_path_buf(),
            branch: branch.to_string(),
            credentials: credentials.cloned(),
        });
        self.check("clone")?;
        fs::create_dir_all(path.join(MARKER))?;
        Ok(self.working_copy(path))
    }
}

pub(crate) struct FakeWorkingCopy {
    vcs: FakeVcs,
    workdir: PathBuf,
    metadata_dir: PathBuf,
    commits: u32,
}

impl WorkingCopy for FakeWorkingCopy {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    fn pull(&mut self, branch: &str, credentials: Option<&Credentials>) -> Result<(), GitError> {
        self.vcs.record(Call::Pull {
            branch: branch.to_string(),
            credentials: credentials.cloned(),
        });
        self.vcs.check("pull")
    }

    fn stage_all(&mut self) -> Result<(), GitError> {
        self.vcs.record(Call::StageAll);
        self.vcs.check("stage")
    }

    fn commit(&mut self, message: &str) -> Result<String, GitError> {
        self.vcs.record(Call::Commit(message.to_string()));
        self.vcs.check("commit")?;
        self.commits += 1;
        Ok(format!("fake-commit-{}", self.commits))
    }

    fn push(&mut self, branch: &str, credentials: Option<&Credentials>) -> Result<(), GitError> {
        self.vcs.record(Call::Push {
            branch: branch.to_string(),
            credentials: credentials.cloned(),
        });
        self.vcs.check("push")
    }

    fn close(&mut self) -> Result<(), GitError> {
        self.vcs.record(Call::Close);
        self.vcs.check("close")
    }
}
