//! Build-log artifacts: finding them and reading the per-project results they record.

mod load;
mod locate;
mod types;

use std::path::PathBuf;

use thiserror::Error;

pub use load::load_results;
pub use locate::find_latest;
pub use types::{AnalysisResult, BuildLog, BuildLogArtifact, select_result};

#[derive(Debug, Error)]
pub enum BuildLogError {
  #[error("failed to scan {root} for build logs: {source}")]
  Scan {
    root: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("build log {0} not found")]
  Missing(PathBuf),

  #[error("failed to read build log {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse build log {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("unsupported build log version {version} in {path}")]
  UnsupportedVersion { path: PathBuf, version: u32 },
}

impl BuildLogError {
  /// The log exists but its content cannot be used.
  pub fn is_corrupt(&self) -> bool {
    matches!(self, BuildLogError::Parse { .. } | BuildLogError::UnsupportedVersion { .. })
  }
}
