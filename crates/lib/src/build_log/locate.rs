//! Finding the most recent build log in a project directory.

use std::path::Path;

use tracing::debug;

use super::BuildLogError;
use super::types::BuildLogArtifact;
use crate::directory::ProjectDirectory;

/// The most recently modified top-level file with `extension`, if any.
///
/// Equal modification times are broken by file name so the choice is stable.
pub fn find_latest(directory: &ProjectDirectory, extension: &str) -> Result<Option<BuildLogArtifact>, BuildLogError> {
  let files = directory.all_files().map_err(|source| BuildLogError::Scan {
    root: directory.root().to_path_buf(),
    source,
  })?;

  let latest = files
    .into_iter()
    .filter(|file| has_extension(file, extension))
    .filter_map(|path| {
      let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
      Some(BuildLogArtifact { path, modified })
    })
    .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

  debug!(root = ?directory.root(), found = ?latest.as_ref().map(|a| &a.path), "located build log");
  Ok(latest)
}

fn has_extension(path: &Path, extension: &str) -> bool {
  path.extension().is_some_and(|ext| ext == extension)
}
