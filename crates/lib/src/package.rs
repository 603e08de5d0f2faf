//! The pipeline owner.
//!
//! A [`ProjectPackage`] wires the three stages for one project:
//!
//! 1. cache check: reuse the last build result or clean up after it
//! 2. build: pass a cached result through, otherwise run the build tool
//! 3. workspace: materialize the code model from the build result
//!
//! Each stage runs at most once successfully per package; concurrent callers
//! share the in-flight work.

use std::path::Path;
use std::sync::Arc;

use crate::build::{BuildTool, build_project};
use crate::build_log::AnalysisResult;
use crate::cache::load_result_or_clean;
use crate::config::BuildConfig;
use crate::dir_lock::DirectoryLocks;
use crate::directory::ProjectDirectory;
use crate::error::PackageError;
use crate::project::ProjectDescriptor;
use crate::stage::PipelineStage;
use crate::workspace::{CodeModelWorkspace, DefaultWorkspaceFactory, WorkspaceFactory, materialize};

/// How often each stage's producer has been started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageRuns {
  pub cache_check: usize,
  pub build: usize,
  pub workspace: usize,
}

pub struct ProjectPackage<B: BuildTool> {
  project: ProjectDescriptor,
  tool: Arc<B>,
  cache_check: PipelineStage<Option<AnalysisResult>, PackageError>,
  build: PipelineStage<AnalysisResult, PackageError>,
  workspace: PipelineStage<CodeModelWorkspace, PackageError>,
}

impl<B: BuildTool> std::fmt::Debug for ProjectPackage<B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProjectPackage")
      .field("project", &self.project)
      .field("cache_check", &self.cache_check)
      .field("build", &self.build)
      .field("workspace", &self.workspace)
      .finish()
  }
}

impl<B: BuildTool> ProjectPackage<B> {
  pub fn new(project: ProjectDescriptor, tool: Arc<B>, config: Arc<BuildConfig>) -> Self {
    Self::with_factory(project, tool, Arc::new(DefaultWorkspaceFactory), config)
  }

  /// Resolve the project under `root` and create its package.
  ///
  /// Fails with [`PackageError::Configuration`] when the project file is missing
  /// or ambiguous.
  pub fn open(
    root: &Path,
    project_file_name: Option<&str>,
    locks: Arc<DirectoryLocks>,
    tool: Arc<B>,
    config: Arc<BuildConfig>,
  ) -> Result<Self, PackageError> {
    let directory = ProjectDirectory::new(root, locks, &config)?;
    let project = ProjectDescriptor::new(directory, project_file_name, &config)?;
    Ok(Self::new(project, tool, config))
  }

  pub fn with_factory(
    project: ProjectDescriptor,
    tool: Arc<B>,
    factory: Arc<dyn WorkspaceFactory>,
    config: Arc<BuildConfig>,
  ) -> Self {
    let cache_check = {
      let project = project.clone();
      let config = config.clone();
      PipelineStage::new(move || {
        let project = project.clone();
        let config = config.clone();
        async move { load_result_or_clean(&project, &config).await }
      })
    };

    let build = {
      let project = project.clone();
      let tool = tool.clone();
      cache_check.then(move |cached: Arc<Option<AnalysisResult>>| {
        let project = project.clone();
        let tool = tool.clone();
        let config = config.clone();
        async move { build_project((*cached).clone(), &project, tool.as_ref(), &config).await }
      })
    };

    let workspace = {
      let name = project.name().to_string();
      build.then(move |result: Arc<AnalysisResult>| {
        let factory = factory.clone();
        let name = name.clone();
        async move { materialize(&result, factory.as_ref(), &name) }
      })
    };

    Self {
      project,
      tool,
      cache_check,
      build,
      workspace,
    }
  }

  pub fn project(&self) -> &ProjectDescriptor {
    &self.project
  }

  pub fn name(&self) -> &str {
    self.project.name()
  }

  pub fn tool(&self) -> &Arc<B> {
    &self.tool
  }

  /// The successful build result, building only when the cache is stale.
  pub async fn build_result(&self) -> Result<Arc<AnalysisResult>, PackageError> {
    self.build.get_latest().await
  }

  pub async fn create_workspace(&self) -> Result<Arc<CodeModelWorkspace>, PackageError> {
    self.workspace.get_latest().await
  }

  pub async fn create_workspace_for_run(&self) -> Result<Arc<CodeModelWorkspace>, PackageError> {
    self.create_workspace().await
  }

  pub async fn create_workspace_for_language_services(&self) -> Result<Arc<CodeModelWorkspace>, PackageError> {
    self.create_workspace().await
  }

  pub fn stage_runs(&self) -> StageRuns {
    StageRuns {
      cache_check: self.cache_check.runs(),
      build: self.build.runs(),
      workspace: self.workspace.runs(),
    }
  }

  /// Whether the cache check found a reusable build. `None` until it has run.
  pub fn build_was_reused(&self) -> Option<bool> {
    self.cache_check.peek().map(|cached| cached.is_some())
  }
}
