//! In-place file mutations inside a working copy.
//!
//! Two operations are supported:
//! - [`rewrite`] replaces a file's content entirely.
//! - [`prepend`] inserts a log entry before a file's existing content.
//!
//! Files cannot be grown at the front, so a prepend streams the original
//! bytes into a sibling `<name>.tmp`, truncates the original, writes the
//! entry, streams the saved bytes back and deletes the temporary file. The
//! file is never loaded into memory.
//!
//! The sequence is not atomic against crashes: if the process dies after the
//! original is truncated and before the copy-back finishes, the prior content
//! only survives in the `.tmp` file. A prepend refuses to run while that file
//! exists, so it is never overwritten; it has to be restored or removed by
//! hand. Until then it is an ordinary untracked file, and a publish that
//! stages everything will commit it.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Line separator written into mutated files.
pub const LINE_BREAK: &str = "\n";
/// Default prepend target.
pub const README: &str = "README.md";

const TITLE_PREFIX: &str = "## ";
const MESSAGE_PREFIX: &str = "* ";
const TMP_SUFFIX: &str = ".tmp";

/// A titled list of messages rendered as a markdown section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub title: String,
    pub messages: Vec<String>,
}

impl LogEntry {
    pub fn new<I, S>(title: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Render as `## title`, a blank line, one `* message` line per message
    /// and a trailing blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(TITLE_PREFIX);
        out.push_str(&self.title);
        out.push_str(LINE_BREAK);
        out.push_str(LINE_BREAK);
        for message in &self.messages {
            out.push_str(MESSAGE_PREFIX);
            out.push_str(message);
            out.push_str(LINE_BREAK);
        }
        out.push_str(LINE_BREAK);
        out
    }
}

/// A change to apply to one file of the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Insert `entry` before the file's current content.
    Prepend { path: PathBuf, entry: LogEntry },
    /// Replace the file's content with `content`.
    Rewrite { path: PathBuf, content: String },
}

impl Mutation {
    pub fn path(&self) -> &Path {
        match self {
            Mutation::Prepend { path, .. } | Mutation::Rewrite { path, .. } => path,
        }
    }

    /// Apply to the working copy rooted at `root`.
    pub fn apply(&self, root: &Path) -> Result<()> {
        match self {
            Mutation::Prepend { path, entry } => prepend(root, path, entry),
            Mutation::Rewrite { path, content } => rewrite(root, path, content),
        }
    }
}

/// Replace the content of `relative` under `root` with `content`, creating
/// the file and its parent directories when missing.
pub fn rewrite(root: &Path, relative: &Path, content: &str) -> Result<()> {
    let path = resolve(root, relative)?;
    overwrite(&path, content).map_err(|e| Error::mutation(&path, e))?;
    log::debug!("rewrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}

/// Prepend `entry` to `README.md` under `root`.
pub fn prepend_readme(root: &Path, entry: &LogEntry) -> Result<()> {
    prepend(root, Path::new(README), entry)
}

/// Insert `entry` before the content of `relative` under `root`.
///
/// A missing file (and its parents) is created first, so it behaves as if
/// its prior content were empty. Fails without touching the file when its
/// `<name>.tmp` sibling already exists.
pub fn prepend(root: &Path, relative: &Path, entry: &LogEntry) -> Result<()> {
    prepend_using(&SiblingFile, root, relative, entry)
}

/// Holds the original bytes while the head of the file is rewritten.
trait Scratch {
    type File: Read + Write + Seek;

    fn create(&self, path: &Path) -> io::Result<Self::File>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// A plain sibling file on disk.
struct SiblingFile;

impl Scratch for SiblingFile {
    type File = File;

    fn create(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// How far a prepend got before failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Started,
    Copying,
    Truncated,
}

fn prepend_using<S: Scratch>(
    scratch: &S,
    root: &Path,
    relative: &Path,
    entry: &LogEntry,
) -> Result<()> {
    let path = resolve(root, relative)?;
    let tmp_path = temp_sibling(&path);
    if fs::symlink_metadata(&tmp_path).is_ok() {
        return Err(Error::mutation(
            &path,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "{} exists and may hold content from an interrupted prepend",
                    tmp_path.display()
                ),
            ),
        ));
    }
    ensure_file(&path).map_err(|e| Error::mutation(&path, e))?;

    let header = entry.render();
    let mut progress = Progress::Started;
    let outcome = prepend_via_temp(scratch, &path, &tmp_path, header.as_bytes(), &mut progress);
    if let Err(e) = outcome {
        match progress {
            Progress::Truncated => log::warn!(
                "prepend to {} failed after truncation; prior content is kept in {}",
                path.display(),
                tmp_path.display()
            ),
            Progress::Copying => {
                if let Err(cleanup) = scratch.remove(&tmp_path) {
                    log::warn!("failed to remove {}: {}", tmp_path.display(), cleanup);
                }
            }
            Progress::Started => {}
        }
        return Err(Error::mutation(&path, e));
    }

    scratch.remove(&tmp_path).map_err(|source| Error::Cleanup {
        path: tmp_path.clone(),
        source,
    })?;

    log::debug!(
        "prepended '{}' ({} messages) to {}",
        entry.title,
        entry.messages.len(),
        path.display()
    );
    Ok(())
}

/// Copy-out, rewrite-head, copy-back, recording in `progress` how far it got.
fn prepend_via_temp<S: Scratch>(
    scratch: &S,
    path: &Path,
    tmp_path: &Path,
    header: &[u8],
    progress: &mut Progress,
) -> io::Result<()> {
    let mut source = OpenOptions::new().read(true).write(true).open(path)?;
    let mut tmp = scratch.create(tmp_path)?;
    *progress = Progress::Copying;

    io::copy(&mut source, &mut tmp)?;
    tmp.flush()?;

    source.seek(SeekFrom::Start(0))?;
    *progress = Progress::Truncated;
    source.set_len(0)?;
    source.write_all(header)?;

    tmp.seek(SeekFrom::Start(0))?;
    io::copy(&mut tmp, &mut source)?;
    source.sync_all()?;
    Ok(())
}

fn overwrite(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content.as_bytes())
}

fn ensure_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(())
}

/// Join `relative` onto `root`, refusing anything that could leave the
/// working copy.
fn resolve(root: &Path, relative: &Path) -> Result<PathBuf> {
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.file_name().is_none() {
        return Err(Error::mutation(
            relative,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "path must name a file relative to the working copy",
            ),
        ));
    }
    Ok(root.join(relative))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}
