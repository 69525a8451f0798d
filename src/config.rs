//! Sync configuration.
//!
//! `SyncConfig` is an immutable value built through [`SyncConfigBuilder`].
//! Building validates the mandatory fields without touching the filesystem or
//! the network, so a bad configuration never causes partial work.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use thiserror::Error;

/// Branch used when none is configured.
pub const DEFAULT_BRANCH: &str = "master";

/// Errors raised while validating a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No remote URI was supplied.
    #[error("remote URI must be set")]
    MissingRemoteUri,
    /// No local path was supplied.
    #[error("local path must be set")]
    MissingLocalPath,
    /// The branch name is unusable as a ref.
    #[error("invalid branch name {name:?}: {reason}")]
    InvalidBranch { name: String, reason: &'static str },
}

/// A username and password (or token) pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated settings for one sync-mutate-publish run.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    local_path: PathBuf,
    remote_uri: String,
    branch: String,
    username: Option<String>,
    password: Option<String>,
    commit_message: String,
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_uri(&self) -> &str {
        &self.remote_uri
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    /// Credentials are only used when both halves are present.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("local_path", &self.local_path)
            .field("remote_uri", &self.remote_uri)
            .field("branch", &self.branch)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("commit_message", &self.commit_message)
            .finish()
    }
}

/// Incremental builder for [`SyncConfig`].
#[derive(Debug, Default, Clone)]
pub struct SyncConfigBuilder {
    local_path: Option<PathBuf>,
    remote_uri: Option<String>,
    branch: Option<String>,
    username: Option<String>,
    password: Option<String>,
    commit_message: Option<String>,
}

impl SyncConfigBuilder {
    pub fn local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn remote_uri(mut self, uri: impl Into<String>) -> Self {
        self.remote_uri = Some(uri.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// Performs no I/O.
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let remote_uri = self
            .remote_uri
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(ConfigError::MissingRemoteUri)?;
        let local_path = self
            .local_path
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingLocalPath)?;

        let branch = self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        validate_branch(&branch)?;

        if self.username.is_some() != self.password.is_some() {
            log::warn!("only one of username/password is set; credentials will not be used");
        }

        let commit_message = self
            .commit_message
            .unwrap_or_else(|| default_commit_message(Local::now()));

        Ok(SyncConfig {
            local_path,
            remote_uri,
            branch,
            username: self.username,
            password: self.password,
            commit_message,
        })
    }
}

/// Commit message used when none is configured, e.g.
/// `Update on : 2024-05-01T12:30:00+02:00`.
pub fn default_commit_message(now: DateTime<Local>) -> String {
    format!(
        "Update on : {}",
        now.to_rfc3339_opts(SecondsFormat::Secs, false)
    )
}

/// Reject branch names that cannot be a ref or could be read as a flag.
fn validate_branch(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("cannot be empty")
    } else if name.contains("..") {
        Some("cannot contain '..'")
    } else if name.starts_with('-') {
        Some("cannot start with '-'")
    } else if name.bytes().any(|b| b < 0x20 || b == 0x7f) {
        Some("cannot contain control characters")
    } else if name.contains(' ') {
        Some("cannot contain spaces")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidBranch {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
