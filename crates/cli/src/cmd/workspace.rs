//! Implementation of the `kiln workspace` command.
//!
//! Runs the full pipeline for one project: reuse or clean the previous build,
//! build when needed, then materialize the workspace.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use kiln_lib::{CommandBuildTool, DirectoryLocks, ProjectPackage};

use super::{load_config, runtime};
use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, print_warning};

#[derive(Debug, Serialize)]
struct WorkspaceSummary {
  project: String,
  root: PathBuf,
  build_reused: bool,
  documents: usize,
  references: usize,
  warnings: Vec<String>,
  #[serde(skip)]
  elapsed: Duration,
}

pub fn cmd_workspace(dir: &Path, project: Option<&str>, config: Option<&Path>, format: OutputFormat) -> Result<()> {
  let config = load_config(config)?;
  let tool = Arc::new(CommandBuildTool::new(config.build_command.clone()));
  let package = ProjectPackage::open(dir, project, Arc::new(DirectoryLocks::new()), tool, config)
    .with_context(|| format!("Failed to open project in {}", dir.display()))?;

  let rt = runtime()?;
  let started = Instant::now();
  let code_model = rt
    .block_on(package.create_workspace())
    .with_context(|| format!("Failed to create workspace for {}", package.name()))?;

  let solution = code_model.solution();
  let summary = WorkspaceSummary {
    project: package.name().to_string(),
    root: package.project().root().to_path_buf(),
    build_reused: package.build_was_reused().unwrap_or(false),
    documents: solution.projects().iter().map(|p| p.documents.len()).sum(),
    references: solution.projects().iter().map(|p| p.metadata_references.len()).sum(),
    warnings: code_model.warnings().to_vec(),
    elapsed: started.elapsed(),
  };
  info!(project = %summary.project, reused = summary.build_reused, "workspace created");

  if format.is_json() {
    return print_json(&summary);
  }

  print_success(&format!("Workspace ready for {}", summary.project));
  print_stat("Root", &summary.root.display().to_string());
  print_stat("Build", if summary.build_reused { "reused" } else { "rebuilt" });
  print_stat("Documents", &summary.documents.to_string());
  print_stat("References", &summary.references.to_string());
  print_stat("Time", &format_duration(summary.elapsed));
  for warning in &summary.warnings {
    print_warning(warning);
  }

  Ok(())
}
