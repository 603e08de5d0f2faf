//! Build-log content.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::consts::BUILD_LOG_VERSION;

/// A build-log file found on disk. Never cached; re-located on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLogArtifact {
  pub path: PathBuf,
  pub modified: SystemTime,
}

/// The document the build tool writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLog {
  pub version: u32,
  #[serde(default)]
  pub projects: Vec<AnalysisResult>,
}

impl BuildLog {
  pub fn new(projects: Vec<AnalysisResult>) -> Self {
    Self {
      version: BUILD_LOG_VERSION,
      projects,
    }
  }
}

/// The recorded build outcome of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub project_file_path: PathBuf,
  pub succeeded: bool,
  #[serde(default)]
  pub source_files: Vec<PathBuf>,
  /// Everything handed to the compiler; empty when compilation was skipped.
  #[serde(default)]
  pub compile_inputs: Vec<PathBuf>,
  #[serde(default)]
  pub references: Vec<PathBuf>,
}

impl AnalysisResult {
  /// True when the build actually compiled something.
  ///
  /// Up-to-date checks can report success without compiling; such a log says
  /// nothing about the state of the outputs.
  pub fn did_perform_core_compile(&self) -> bool {
    !self.compile_inputs.is_empty() && !self.source_files.is_empty()
  }

  pub fn is_reusable(&self) -> bool {
    self.succeeded && self.did_perform_core_compile()
  }

  pub fn matches_project(&self, project_file: &Path) -> bool {
    if self.project_file_path == project_file {
      return true;
    }
    match (
      dunce::canonicalize(&self.project_file_path),
      dunce::canonicalize(project_file),
    ) {
      (Ok(recorded), Ok(wanted)) => recorded == wanted,
      _ => false,
    }
  }
}

/// Pick the result recorded for `project_file`.
pub fn select_result(results: Vec<AnalysisResult>, project_file: &Path) -> Option<AnalysisResult> {
  results.into_iter().find(|result| result.matches_project(project_file))
}
