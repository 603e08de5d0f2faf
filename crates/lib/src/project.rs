//! Project identity within a directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::BuildConfig;
use crate::directory::ProjectDirectory;

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("no .{extension} project file found in {root}")]
  NoProjectFile { root: PathBuf, extension: String },

  #[error("multiple .{extension} project files found in {root}: {candidates:?}")]
  AmbiguousProjectFile {
    root: PathBuf,
    extension: String,
    candidates: Vec<PathBuf>,
  },

  #[error("failed to read project directory {root}: {source}")]
  ReadDir {
    root: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Identifies the single project a pipeline builds.
///
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
  directory: ProjectDirectory,
  project_file: PathBuf,
  name: String,
  sentinel_path: PathBuf,
}

impl ProjectDescriptor {
  /// Resolve the project in `directory`.
  ///
  /// With no explicit (or a blank) `project_file_name`, the root must contain exactly
  /// one file with the configured project extension.
  pub fn new(
    directory: ProjectDirectory,
    project_file_name: Option<&str>,
    config: &BuildConfig,
  ) -> Result<Self, ProjectError> {
    let project_file = match project_file_name.map(str::trim).filter(|name| !name.is_empty()) {
      Some(name) => directory.file_path(name),
      None => find_single_project_file(&directory, &config.project_extension)?,
    };

    let name = project_file
      .file_name()
      .or_else(|| directory.root().file_name())
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    let sentinel_path = directory.file_path(&config.sentinel_file_name);

    Ok(Self {
      directory,
      project_file,
      name,
      sentinel_path,
    })
  }

  pub fn directory(&self) -> &ProjectDirectory {
    &self.directory
  }

  pub fn root(&self) -> &Path {
    self.directory.root()
  }

  pub fn project_file(&self) -> &Path {
    &self.project_file
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// File holding the diagnostics of the last failed build.
  pub fn sentinel_path(&self) -> &Path {
    &self.sentinel_path
  }

  /// Contents of the sentinel file, if the last build failed.
  pub fn last_build_error(&self) -> Option<String> {
    std::fs::read_to_string(&self.sentinel_path).ok()
  }
}

fn find_single_project_file(directory: &ProjectDirectory, extension: &str) -> Result<PathBuf, ProjectError> {
  let files = directory.all_files().map_err(|source| ProjectError::ReadDir {
    root: directory.root().to_path_buf(),
    source,
  })?;

  let mut candidates: Vec<PathBuf> = files
    .into_iter()
    .filter(|file| file.extension().is_some_and(|ext| ext == extension))
    .collect();

  match candidates.len() {
    0 => Err(ProjectError::NoProjectFile {
      root: directory.root().to_path_buf(),
      extension: extension.to_string(),
    }),
    1 => Ok(candidates.remove(0)),
    _ => Err(ProjectError::AmbiguousProjectFile {
      root: directory.root().to_path_buf(),
      extension: extension.to_string(),
      candidates,
    }),
  }
}
