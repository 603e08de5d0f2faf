//! Filesystem access for one project root.
//!
//! All file listing, path resolution and locking for a project goes through
//! [`ProjectDirectory`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::BuildConfig;
use crate::dir_lock::{DirectoryLock, DirectoryLockError, DirectoryLocks};

#[derive(Debug, Clone)]
pub struct ProjectDirectory {
  root: PathBuf,
  locks: Arc<DirectoryLocks>,
  lock_file_name: String,
  lock_timeout: Duration,
}

impl ProjectDirectory {
  /// Open `root`, which must be an existing directory.
  pub fn new(root: &Path, locks: Arc<DirectoryLocks>, config: &BuildConfig) -> io::Result<Self> {
    let root = dunce::canonicalize(root)?;
    if !root.is_dir() {
      return Err(io::Error::new(
        io::ErrorKind::NotADirectory,
        format!("{} is not a directory", root.display()),
      ));
    }

    Ok(Self {
      root,
      locks,
      lock_file_name: config.lock_file_name.clone(),
      lock_timeout: config.lock_timeout,
    })
  }

  /// The fully qualified project root.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Fully qualified path of `name` relative to the root.
  pub fn file_path(&self, name: &str) -> PathBuf {
    self.root.join(name)
  }

  /// Regular files directly under the root, sorted by path.
  pub fn all_files(&self) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&self.root)? {
      let entry = entry?;
      if entry.file_type()?.is_file() {
        files.push(entry.path());
      }
    }
    files.sort();
    Ok(files)
  }

  /// Directories directly under the root named `name`.
  pub fn subdirectories_named(&self, name: &str) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(&self.root)? {
      let entry = entry?;
      if entry.file_type()?.is_dir() && entry.file_name() == name {
        dirs.push(entry.path());
      }
    }
    Ok(dirs)
  }

  /// Take the exclusive lock for this directory. Released when the guard drops.
  pub async fn lock(&self, command: &str) -> Result<DirectoryLock, DirectoryLockError> {
    self
      .locks
      .acquire(&self.root, &self.lock_file_name, command, self.lock_timeout)
      .await
  }
}
