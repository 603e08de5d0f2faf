//! Running the external build and turning its log into a build result.
//!
//! # Submodules
//!
//! - [`execute`] - Build stage: invoke the tool, maintain the sentinel file, reload the log
//! - [`tool`] - The [`BuildTool`] seam and its process-backed implementation

pub mod execute;
pub mod tool;

use std::path::PathBuf;

use thiserror::Error;

pub use execute::{build_project, run_build_tool};
pub use tool::{BuildOutput, BuildRequest, BuildTool, CommandBuildTool};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to launch build tool {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{project} failed to build (exit code {code:?}), see {sentinel}")]
  ToolFailed {
    project: String,
    code: Option<i32>,
    sentinel: PathBuf,
    diagnostics: String,
  },

  #[error("{project} failed to build: no build log was written")]
  NoBuildLog { project: String },

  #[error("the build log {log} seems to contain no projects")]
  EmptyBuildLog { log: PathBuf },

  #[error("{project} failed to build: the build log has no result for it")]
  NoMatchingResult { project: String },

  #[error("{project} failed to build: the build log reports failure")]
  Unsuccessful { project: String },

  #[error("failed to update build error log {path}: {source}")]
  Sentinel {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
