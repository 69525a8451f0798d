//! Layered settings feeding [`SyncConfig`].
//!
//! Values come from an optional JSON file, then environment variables and
//! command-line flags. Every field is optional at this level; the
//! [`SyncConfigBuilder`] decides what is mandatory.
//!
//! ```json
//! {
//!   "remote_uri": "https://example.com/team/log.git",
//!   "local_path": "/var/lib/gitjot/log",
//!   "branch": "main",
//!   "username": "bot"
//! }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::config::{SyncConfig, SyncConfigBuilder};

/// Errors loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Partially specified sync settings.
#[derive(Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub remote_uri: Option<String>,
    pub local_path: Option<PathBuf>,
    pub branch: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub commit_message: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("remote_uri", &self.remote_uri)
            .field("local_path", &self.local_path)
            .field("branch", &self.branch)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("commit_message", &self.commit_message)
            .finish()
    }
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `higher` on top of `self`; fields set in `higher` win.
    pub fn overlay(self, higher: Settings) -> Settings {
        Settings {
            remote_uri: higher.remote_uri.or(self.remote_uri),
            local_path: higher.local_path.or(self.local_path),
            branch: higher.branch.or(self.branch),
            username: higher.username.or(self.username),
            password: higher.password.or(self.password),
            commit_message: higher.commit_message.or(self.commit_message),
        }
    }

    pub fn into_builder(self) -> SyncConfigBuilder {
        let mut builder = SyncConfig::builder();
        if let Some(remote_uri) = self.remote_uri {
            builder = builder.remote_uri(remote_uri);
        }
        if let Some(local_path) = self.local_path {
            builder = builder.local_path(local_path);
        }
        if let Some(branch) = self.branch {
            builder = builder.branch(branch);
        }
        if let Some(username) = self.username {
            builder = builder.username(username);
        }
        if let Some(password) = self.password {
            builder = builder.password(password);
        }
        if let Some(commit_message) = self.commit_message {
            builder = builder.commit_message(commit_message);
        }
        builder
    }
}
