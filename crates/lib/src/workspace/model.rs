//! In-memory code model.
//!
//! A [`Workspace`] holds the current [`Solution`], an immutable snapshot of its
//! projects. Edits derive a new solution from a snapshot and commit it with
//! `Workspace::try_apply_changes` (crate-internal); a commit based on an outdated snapshot is
//! refused.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
  #[error("project {0} is not part of the solution")]
  UnknownProject(ProjectId),

  #[error("solution is based on version {base} but the workspace is at version {current}")]
  StaleSolution { base: u64, current: u64 },

  #[error("workspace is read-only")]
  ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProjectId(pub u32);

impl std::fmt::Display for ProjectId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
  pub name: String,
  pub path: PathBuf,
}

impl Document {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.to_string_lossy().into_owned());
    Self { name, path }
  }
}

/// A compiled library the project links against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataReference {
  pub path: PathBuf,
}

impl MetadataReference {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceProject {
  pub id: ProjectId,
  pub name: String,
  pub project_file_path: PathBuf,
  pub documents: Vec<Document>,
  pub metadata_references: Vec<MetadataReference>,
}

/// Immutable snapshot of a workspace's projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
  version: u64,
  projects: Vec<WorkspaceProject>,
}

impl Solution {
  pub fn new(projects: Vec<WorkspaceProject>) -> Self {
    Self { version: 0, projects }
  }

  /// Version of the workspace state this snapshot was taken from.
  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn projects(&self) -> &[WorkspaceProject] {
    &self.projects
  }

  pub fn project(&self, id: ProjectId) -> Option<&WorkspaceProject> {
    self.projects.iter().find(|p| p.id == id)
  }

  pub fn project_by_file(&self, project_file: &Path) -> Option<&WorkspaceProject> {
    self.projects.iter().find(|p| p.project_file_path == project_file)
  }

  /// A copy of this snapshot with the references of `id` replaced.
  pub fn with_project_metadata_references(
    &self,
    id: ProjectId,
    references: Vec<MetadataReference>,
  ) -> Result<Solution, WorkspaceError> {
    let mut next = self.clone();
    let project = next
      .projects
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or(WorkspaceError::UnknownProject(id))?;
    project.metadata_references = references;
    Ok(next)
  }
}

#[derive(Debug)]
pub struct Workspace {
  current: RwLock<Arc<Solution>>,
  read_only: bool,
}

impl Workspace {
  pub fn new(solution: Solution) -> Self {
    Self {
      current: RwLock::new(Arc::new(solution)),
      read_only: false,
    }
  }

  /// A workspace refusing every change.
  pub fn read_only(solution: Solution) -> Self {
    Self {
      read_only: true,
      ..Self::new(solution)
    }
  }

  pub fn current_solution(&self) -> Arc<Solution> {
    self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
  }

  /// Commit `solution` if it was derived from the current version.
  pub(crate) fn try_apply_changes(&self, solution: Solution) -> Result<(), WorkspaceError> {
    if self.read_only {
      return Err(WorkspaceError::ReadOnly);
    }

    let mut current = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    if solution.version != current.version {
      return Err(WorkspaceError::StaleSolution {
        base: solution.version,
        current: current.version,
      });
    }

    *current = Arc::new(Solution {
      version: current.version + 1,
      ..solution
    });
    Ok(())
  }
}
