//! The build stage.
//!
//! Runs only when the cache check found nothing reusable. The whole
//! build-then-reload sequence happens under one directory lock so no other
//! pipeline sees a half-written log.

use std::io;

use tokio::fs;
use tracing::{debug, error, info};

use super::{BuildError, BuildRequest, BuildTool};
use crate::build_log::{AnalysisResult, find_latest, load_results, select_result};
use crate::cache::{CacheVerdict, judge};
use crate::config::BuildConfig;
use crate::error::PackageError;
use crate::project::ProjectDescriptor;

/// Invoke the build tool once and maintain the sentinel file.
///
/// On a nonzero exit the captured diagnostics are written to the sentinel file;
/// on success a sentinel left by an earlier failure is removed.
pub async fn run_build_tool<B: BuildTool>(
  project: &ProjectDescriptor,
  tool: &B,
  config: &BuildConfig,
) -> Result<(), BuildError> {
  let project_file = project.project_file();
  let request = BuildRequest {
    root: project.root().to_path_buf(),
    project_file: project_file.exists().then(|| project_file.to_path_buf()),
    log_file_name: config.build_log_file_name.clone(),
  };

  let output = tool.build(&request).await?;
  let sentinel = project.sentinel_path();

  if !output.success() {
    let diagnostics = output.diagnostics();
    fs::write(sentinel, &diagnostics)
      .await
      .map_err(|source| BuildError::Sentinel {
        path: sentinel.to_path_buf(),
        source,
      })?;

    error!(project = project.name(), code = ?output.exit_code, sentinel = ?sentinel, "build failed");
    return Err(BuildError::ToolFailed {
      project: project.name().to_string(),
      code: output.exit_code,
      sentinel: sentinel.to_path_buf(),
      diagnostics,
    });
  }

  match fs::remove_file(sentinel).await {
    Ok(()) => debug!(sentinel = ?sentinel, "cleared previous build error"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(source) => {
      return Err(BuildError::Sentinel {
        path: sentinel.to_path_buf(),
        source,
      });
    }
  }

  Ok(())
}

/// Produce a successful build result for `project`.
///
/// A `cached` result from the cache check is passed through without invoking
/// the build tool.
pub async fn build_project<B: BuildTool>(
  cached: Option<AnalysisResult>,
  project: &ProjectDescriptor,
  tool: &B,
  config: &BuildConfig,
) -> Result<AnalysisResult, PackageError> {
  if let Some(result) = cached {
    debug!(project = project.name(), "reusing cached build result");
    return Ok(result);
  }

  let _lock = project.directory().lock("build").await?;

  // Another pipeline may have rebuilt the project while we waited for the lock.
  let latest = find_latest(project.directory(), &config.build_log_extension)?;
  if let CacheVerdict::Reusable(result) = judge(latest.as_ref(), project, config).await? {
    info!(project = project.name(), "project was rebuilt concurrently, reusing its result");
    return Ok(result);
  }

  info!(project = project.name(), root = ?project.root(), "building project");
  run_build_tool(project, tool, config).await?;

  let Some(artifact) = find_latest(project.directory(), &config.build_log_extension)? else {
    return Err(
      BuildError::NoBuildLog {
        project: project.name().to_string(),
      }
      .into(),
    );
  };

  let results = load_results(&artifact, config.log_ready_timeout).await?;
  if results.is_empty() {
    return Err(BuildError::EmptyBuildLog { log: artifact.path }.into());
  }

  match select_result(results, project.project_file()) {
    Some(result) if result.succeeded => {
      info!(
        project = project.name(),
        sources = result.source_files.len(),
        references = result.references.len(),
        "build succeeded"
      );
      Ok(result)
    }
    Some(_) => Err(
      BuildError::Unsuccessful {
        project: project.name().to_string(),
      }
      .into(),
    ),
    None => Err(
      BuildError::NoMatchingResult {
        project: project.name().to_string(),
      }
      .into(),
    ),
  }
}
