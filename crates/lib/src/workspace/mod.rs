//! Workspace materialization, the last pipeline stage.
//!
//! A build result is converted into a [`Workspace`] by a [`WorkspaceFactory`].
//! The default conversion leaves metadata references out, so they are patched
//! in afterwards from the build result.

mod model;

pub use model::{Document, MetadataReference, ProjectId, Solution, Workspace, WorkspaceError, WorkspaceProject};

use tracing::{debug, info, warn};

use crate::build_log::AnalysisResult;
use crate::error::PackageError;

/// Converts a build result into a workspace.
pub trait WorkspaceFactory: Send + Sync + 'static {
  /// `None` when the result cannot be represented as a workspace.
  fn create(&self, result: &AnalysisResult) -> Option<Workspace>;
}

/// One project whose documents are the result's source files. References are not carried over.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkspaceFactory;

impl WorkspaceFactory for DefaultWorkspaceFactory {
  fn create(&self, result: &AnalysisResult) -> Option<Workspace> {
    if result.project_file_path.as_os_str().is_empty() || result.source_files.is_empty() {
      return None;
    }

    let name = result
      .project_file_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    let project = WorkspaceProject {
      id: ProjectId(1),
      name,
      project_file_path: result.project_file_path.clone(),
      documents: result.source_files.iter().map(Document::new).collect(),
      metadata_references: Vec::new(),
    };
    Some(Workspace::new(Solution::new(vec![project])))
  }
}

/// The workspace handed to callers.
#[derive(Debug)]
pub struct CodeModelWorkspace {
  workspace: Workspace,
  warnings: Vec<String>,
}

impl CodeModelWorkspace {
  /// The committed snapshot. Callers share this value, so it only ever changes
  /// inside [`materialize`].
  pub fn solution(&self) -> std::sync::Arc<Solution> {
    self.workspace.current_solution()
  }

  /// Problems that did not prevent materialization.
  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }
}

/// Build a workspace for `result` and add the result's references to its project.
pub fn materialize<W: WorkspaceFactory + ?Sized>(
  result: &AnalysisResult,
  factory: &W,
  project_name: &str,
) -> Result<CodeModelWorkspace, PackageError> {
  let workspace = factory
    .create(result)
    .ok_or_else(|| PackageError::WorkspaceCreationFailed {
      project: project_name.to_string(),
      message: "the build result could not be converted".to_string(),
    })?;

  let solution = workspace.current_solution();
  let Some(target) = solution
    .project_by_file(&result.project_file_path)
    .or_else(|| solution.projects().first())
  else {
    return Err(PackageError::WorkspaceCreationFailed {
      project: project_name.to_string(),
      message: "the workspace contains no projects".to_string(),
    });
  };

  let references: Vec<_> = result.references.iter().map(MetadataReference::new).collect();
  let count = references.len();
  let mut warnings = Vec::new();

  match solution
    .with_project_metadata_references(target.id, references)
    .and_then(|updated| workspace.try_apply_changes(updated))
  {
    Ok(()) => debug!(project = project_name, references = count, "added metadata references"),
    Err(e) => {
      warn!(project = project_name, error = %e, "could not add metadata references to workspace");
      warnings.push(format!("metadata references were not applied: {e}"));
    }
  }

  info!(
    project = project_name,
    documents = target.documents.len(),
    references = count,
    "workspace ready"
  );
  Ok(CodeModelWorkspace { workspace, warnings })
}
