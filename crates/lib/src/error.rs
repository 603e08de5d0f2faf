//! Errors surfaced by the build pipeline.
//!
//! [`PackageError`] is `Clone` so every caller waiting on a shared stage receives
//! the same failure. Wrapped errors are held behind `Arc` for that reason.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::build::BuildError;
use crate::build_log::BuildLogError;
use crate::dir_lock::DirectoryLockError;
use crate::project::ProjectError;

#[derive(Debug, Clone, Error)]
pub enum PackageError {
  /// The project could not be identified. Not retried.
  #[error("configuration error: {0}")]
  Configuration(Arc<ProjectError>),

  #[error(transparent)]
  Lock(Arc<DirectoryLockError>),

  #[error(transparent)]
  BuildLog(Arc<BuildLogError>),

  /// The build did not produce a usable result. Diagnostics are in the sentinel file.
  #[error("build failed: {0}")]
  BuildFailed(Arc<BuildError>),

  #[error("failed creating workspace for {project}: {message}")]
  WorkspaceCreationFailed { project: String, message: String },

  #[error("io error: {0}")]
  Io(Arc<io::Error>),
}

impl From<ProjectError> for PackageError {
  fn from(err: ProjectError) -> Self {
    PackageError::Configuration(Arc::new(err))
  }
}

impl From<DirectoryLockError> for PackageError {
  fn from(err: DirectoryLockError) -> Self {
    PackageError::Lock(Arc::new(err))
  }
}

impl From<BuildLogError> for PackageError {
  fn from(err: BuildLogError) -> Self {
    PackageError::BuildLog(Arc::new(err))
  }
}

impl From<BuildError> for PackageError {
  fn from(err: BuildError) -> Self {
    PackageError::BuildFailed(Arc::new(err))
  }
}

impl From<io::Error> for PackageError {
  fn from(err: io::Error) -> Self {
    PackageError::Io(Arc::new(err))
  }
}

impl PackageError {
  pub fn is_build_failure(&self) -> bool {
    matches!(self, PackageError::BuildFailed(_))
  }
}
