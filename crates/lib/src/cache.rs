//! Deciding whether the last build can be reused.
//!
//! The cache check inspects the newest build log in the project directory. A
//! result is reusable only when it succeeded and actually compiled something;
//! anything else invalidates the cache, which removes the log and the
//! intermediate output directories so the next build starts clean. A log that
//! cannot be parsed is an error and is left on disk.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::build_log::{AnalysisResult, BuildLogArtifact, find_latest, load_results, select_result};
use crate::config::BuildConfig;
use crate::error::PackageError;
use crate::project::ProjectDescriptor;
use crate::util::fs::remove_file_when_available;

/// Outcome of judging a build log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CacheVerdict {
  NoBuildLog,
  /// The log could not be parsed.
  Corrupt { message: String },
  NoMatchingProject,
  BuildFailed,
  /// The build succeeded without compiling anything.
  NoCompile,
  Reusable(AnalysisResult),
}

impl CacheVerdict {
  pub fn is_reusable(&self) -> bool {
    matches!(self, CacheVerdict::Reusable(_))
  }

  pub fn describe(&self) -> &'static str {
    match self {
      CacheVerdict::NoBuildLog => "no build log",
      CacheVerdict::Corrupt { .. } => "build log is unreadable",
      CacheVerdict::NoMatchingProject => "build log has no result for the project",
      CacheVerdict::BuildFailed => "last build failed",
      CacheVerdict::NoCompile => "last build did not compile anything",
      CacheVerdict::Reusable(_) => "reusable",
    }
  }
}

/// Judge `artifact` for `project`. Reads only; the caller must hold the directory lock.
///
/// An unreadable log is an error here, not a stale cache.
pub async fn judge(
  artifact: Option<&BuildLogArtifact>,
  project: &ProjectDescriptor,
  config: &BuildConfig,
) -> Result<CacheVerdict, PackageError> {
  let Some(artifact) = artifact else {
    return Ok(CacheVerdict::NoBuildLog);
  };

  let results = load_results(artifact, config.log_ready_timeout).await?;
  Ok(verdict_for(results, project))
}

fn verdict_for(results: Vec<AnalysisResult>, project: &ProjectDescriptor) -> CacheVerdict {
  match select_result(results, project.project_file()) {
    None => CacheVerdict::NoMatchingProject,
    Some(result) if result.is_reusable() => CacheVerdict::Reusable(result),
    Some(result) if !result.succeeded => CacheVerdict::BuildFailed,
    Some(_) => CacheVerdict::NoCompile,
  }
}

/// The cache-check stage: return the reusable result, or clean up and return `None`.
///
/// A cache miss is not an error.
pub async fn load_result_or_clean(
  project: &ProjectDescriptor,
  config: &BuildConfig,
) -> Result<Option<AnalysisResult>, PackageError> {
  let _lock = project.directory().lock("cache-check").await?;

  let artifact = find_latest(project.directory(), &config.build_log_extension)?;
  let verdict = judge(artifact.as_ref(), project, config).await?;

  if let CacheVerdict::Reusable(result) = verdict {
    info!(project = project.name(), "reusing previous build (cache hit)");
    return Ok(Some(result));
  }

  info!(project = project.name(), reason = verdict.describe(), "cache miss, cleaning build state");
  if let Some(artifact) = &artifact {
    remove_file_when_available(&artifact.path, config.log_ready_timeout).await?;
  }
  remove_intermediate_dirs(project, config).await?;

  Ok(None)
}

/// Read-only snapshot of the cache state for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
  pub project: String,
  pub build_log: Option<PathBuf>,
  pub verdict: CacheVerdict,
  pub last_build_error: Option<String>,
}

/// Judge the cache for reporting. Build logs and build output are left in place;
/// only the lock file is touched.
///
/// An unreadable log is reported as [`CacheVerdict::Corrupt`] instead of failing.
pub async fn inspect_cache(project: &ProjectDescriptor, config: &BuildConfig) -> Result<CacheStatus, PackageError> {
  let _lock = project.directory().lock("status").await?;

  let artifact = find_latest(project.directory(), &config.build_log_extension)?;
  let verdict = match &artifact {
    None => CacheVerdict::NoBuildLog,
    Some(artifact) => match load_results(artifact, config.log_ready_timeout).await {
      Ok(results) => verdict_for(results, project),
      Err(e) if e.is_corrupt() => {
        warn!(log = ?artifact.path, error = %e, "build log is unreadable");
        CacheVerdict::Corrupt { message: e.to_string() }
      }
      Err(e) => return Err(e.into()),
    },
  };

  Ok(CacheStatus {
    project: project.name().to_string(),
    build_log: artifact.map(|a| a.path),
    verdict,
    last_build_error: project.last_build_error(),
  })
}

/// What [`clean_project`] removed.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanReport {
  pub removed: Vec<PathBuf>,
}

/// Remove every build log, the intermediate directories and the sentinel file.
pub async fn clean_project(project: &ProjectDescriptor, config: &BuildConfig) -> Result<CleanReport, PackageError> {
  let _lock = project.directory().lock("clean").await?;
  let mut report = CleanReport::default();

  for file in project.directory().all_files()? {
    if file.extension().is_some_and(|ext| ext == config.build_log_extension.as_str()) {
      remove_file_when_available(&file, config.log_ready_timeout).await?;
      report.removed.push(file);
    }
  }

  report.removed.extend(remove_intermediate_dirs(project, config).await?);

  let sentinel = project.sentinel_path();
  match fs::remove_file(sentinel).await {
    Ok(()) => report.removed.push(sentinel.to_path_buf()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(e.into()),
  }

  info!(project = project.name(), removed = report.removed.len(), "cleaned project");
  Ok(report)
}

async fn remove_intermediate_dirs(project: &ProjectDescriptor, config: &BuildConfig) -> io::Result<Vec<PathBuf>> {
  let mut removed = Vec::new();
  for name in &config.intermediate_dirs {
    for dir in project.directory().subdirectories_named(name)? {
      debug!(dir = ?dir, "removing intermediate output");
      fs::remove_dir_all(&dir).await?;
      removed.push(dir);
    }
  }
  Ok(removed)
}
