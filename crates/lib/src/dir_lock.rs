//! Exclusive per-directory locking.
//!
//! A [`DirectoryLock`] combines two layers:
//! - an in-process async mutex keyed by the canonical directory path, held in a
//!   [`DirectoryLocks`] registry that callers share explicitly
//! - an OS advisory lock on a lock file inside the directory, so separate
//!   processes working on the same project are serialized too
//!
//! Both are released when the guard is dropped.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub directory: PathBuf,
}

#[derive(Debug, Error)]
pub enum DirectoryLockError {
  #[error(
    "Directory is locked by another process: {command} (PID {pid}, started {started_at})\n\
             If you're sure no kiln process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "Directory is locked (could not read lock metadata)\n\
             If you're sure no kiln process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// Registry of in-process directory mutexes.
///
/// Every pipeline that may touch the same directory must share one registry
/// (usually behind an `Arc`) for the in-process layer to be effective.
#[derive(Debug, Default)]
pub struct DirectoryLocks {
  locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl DirectoryLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// The mutex for `directory`. Entries nobody holds or waits on are dropped.
  fn mutex_for(&self, directory: &Path) -> Arc<AsyncMutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    // Only the map owns an idle entry; new handles are cloned under this guard.
    locks.retain(|path, mutex| path == directory || Arc::strong_count(mutex) > 1);
    locks.entry(directory.to_path_buf()).or_default().clone()
  }

  #[cfg(test)]
  fn tracked(&self) -> usize {
    self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
  }

  /// Acquire the exclusive lock for `directory`.
  ///
  /// Waits for in-process holders without limit. Another process holding the
  /// lock file is polled until `timeout` elapses.
  pub async fn acquire(
    &self,
    directory: &Path,
    lock_file_name: &str,
    command: &str,
    timeout: Duration,
  ) -> Result<DirectoryLock, DirectoryLockError> {
    let directory = canonical(directory);
    let guard = self.mutex_for(&directory).lock_owned().await;
    debug!(directory = ?directory, "acquired in-process directory lock");

    let lock_path = directory.join(lock_file_name);
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(DirectoryLockError::OpenFile)?;

    let deadline = Instant::now() + timeout;
    loop {
      match try_lock(&file) {
        Ok(()) => break,
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
          if Instant::now() >= deadline {
            return Err(read_contention_error(&lock_path));
          }
          tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
        }
        Err(err) => return Err(DirectoryLockError::LockFailed(err)),
      }
    }

    write_metadata(&file, command, &directory)?;
    debug!(lock = ?lock_path, command, "acquired directory lock file");

    Ok(DirectoryLock {
      file,
      lock_path,
      _guard: guard,
    })
  }
}

/// Scoped exclusive access to one directory.
///
/// Field order matters: the file lock is released before the in-process mutex.
pub struct DirectoryLock {
  file: File,
  lock_path: PathBuf,
  _guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for DirectoryLock {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DirectoryLock").field("lock_path", &self.lock_path).finish()
  }
}

impl DirectoryLock {
  /// Reads the lock metadata from the held file handle.
  ///
  /// Opening a second handle would fail on Windows due to mandatory locking.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

fn canonical(directory: &Path) -> PathBuf {
  dunce::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf())
}

fn write_metadata(file: &File, command: &str, directory: &Path) -> Result<(), DirectoryLockError> {
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    command: command.to_string(),
    directory: directory.to_path_buf(),
  };

  file.set_len(0).map_err(DirectoryLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &metadata)
    .map_err(|e| DirectoryLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(DirectoryLockError::WriteMetadata)?;

  Ok(())
}

fn read_contention_error(lock_path: &Path) -> DirectoryLockError {
  if let Ok(mut file) = File::open(lock_path) {
    let mut contents = String::new();
    if file.read_to_string(&mut contents).is_ok()
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
    {
      let started_at = format!("Unix timestamp {}", metadata.started_at_unix);

      return DirectoryLockError::Contention {
        command: metadata.command,
        pid: metadata.pid,
        started_at,
        lock_path: lock_path.to_path_buf(),
      };
    }
  }

  DirectoryLockError::ContentionUnknown {
    lock_path: lock_path.to_path_buf(),
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result != 0 {
    return Ok(());
  }

  let err = io::Error::last_os_error();
  if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
    Err(io::Error::from(io::ErrorKind::WouldBlock))
  } else {
    Err(err)
  }
}
