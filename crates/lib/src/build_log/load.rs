//! Reading analysis results out of a build log.

use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::BuildLogError;
use super::types::{AnalysisResult, BuildLog, BuildLogArtifact};
use crate::consts::BUILD_LOG_VERSION;
use crate::util::fs::{is_transient, when_available};

/// Parse every project result recorded in `artifact`.
///
/// The build tool may still be flushing the file, so unreadable or truncated
/// content is retried until `timeout` elapses. An empty list is returned as-is.
pub async fn load_results(artifact: &BuildLogArtifact, timeout: Duration) -> Result<Vec<AnalysisResult>, BuildLogError> {
  let path = artifact.path.as_path();
  let log = when_available(timeout, || read_log(path), is_retryable).await?;

  if log.version != BUILD_LOG_VERSION {
    return Err(BuildLogError::UnsupportedVersion {
      path: path.to_path_buf(),
      version: log.version,
    });
  }

  info!(log = ?path, projects = log.projects.len(), "loaded build log");
  Ok(log.projects)
}

fn read_log(path: &Path) -> Result<BuildLog, LoadAttempt> {
  let content = std::fs::read_to_string(path).map_err(|source| {
    if source.kind() == io::ErrorKind::NotFound {
      LoadAttempt::Fatal(BuildLogError::Missing(path.to_path_buf()))
    } else {
      LoadAttempt::Busy(BuildLogError::Read {
        path: path.to_path_buf(),
        source,
      })
    }
  })?;

  serde_json::from_str(&content).map_err(|e| {
    let err = BuildLogError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    };
    if e.is_eof() {
      debug!(log = ?path, "build log truncated, may still be written");
      LoadAttempt::Busy(err)
    } else {
      LoadAttempt::Fatal(err)
    }
  })
}

enum LoadAttempt {
  Busy(BuildLogError),
  Fatal(BuildLogError),
}

impl std::fmt::Display for LoadAttempt {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      LoadAttempt::Busy(err) | LoadAttempt::Fatal(err) => err.fmt(f),
    }
  }
}

impl From<LoadAttempt> for BuildLogError {
  fn from(attempt: LoadAttempt) -> Self {
    match attempt {
      LoadAttempt::Busy(err) | LoadAttempt::Fatal(err) => err,
    }
  }
}

fn is_retryable(attempt: &LoadAttempt) -> bool {
  match attempt {
    LoadAttempt::Busy(BuildLogError::Read { source, .. }) => is_transient(source),
    LoadAttempt::Busy(_) => true,
    LoadAttempt::Fatal(_) => false,
  }
}
