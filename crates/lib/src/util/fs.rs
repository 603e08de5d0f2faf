//! Filesystem helpers for files another process may still be writing.

use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

const AVAILABILITY_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Run `op` until it succeeds, fails with a non-retryable error, or `timeout` elapses.
///
/// The last error is returned once the deadline passes.
pub async fn when_available<T, E, F, R>(timeout: Duration, mut op: F, retryable: R) -> Result<T, E>
where
  F: FnMut() -> Result<T, E>,
  R: Fn(&E) -> bool,
  E: std::fmt::Display,
{
  let deadline = Instant::now() + timeout;
  loop {
    match op() {
      Ok(value) => return Ok(value),
      Err(err) if retryable(&err) && Instant::now() < deadline => {
        debug!(error = %err, "file not yet available, retrying");
        tokio::time::sleep(AVAILABILITY_RETRY_INTERVAL).await;
      }
      Err(err) => return Err(err),
    }
  }
}

/// Any I/O failure other than the file being absent may be transient.
pub fn is_transient(err: &io::Error) -> bool {
  err.kind() != io::ErrorKind::NotFound
}

/// Delete `path` once nothing else holds it. A missing file is not an error.
pub async fn remove_file_when_available(path: &Path, timeout: Duration) -> io::Result<()> {
  match when_available(timeout, || std::fs::remove_file(path), is_transient).await {
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
    other => other,
  }
}
