mod clean;
mod status;
mod workspace;

pub use clean::cmd_clean;
pub use status::cmd_status;
pub use workspace::cmd_workspace;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use kiln_lib::directory::ProjectDirectory;
use kiln_lib::{BuildConfig, DirectoryLocks, ProjectDescriptor};

/// Settings from `--config` (if any) with environment overrides applied.
fn load_config(path: Option<&Path>) -> Result<Arc<BuildConfig>> {
  let config = BuildConfig::load(path).context("Failed to load configuration")?;
  debug!(config = ?config, "loaded configuration");
  Ok(Arc::new(config))
}

/// Resolve the project under `dir` without building it.
fn open_project(dir: &Path, project: Option<&str>, config: &BuildConfig) -> Result<ProjectDescriptor> {
  let directory = ProjectDirectory::new(dir, Arc::new(DirectoryLocks::new()), config)
    .with_context(|| format!("Failed to open project directory {}", dir.display()))?;
  let descriptor = ProjectDescriptor::new(directory, project, config)?;
  Ok(descriptor)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
