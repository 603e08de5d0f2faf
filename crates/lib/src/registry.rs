//! Packages retained across requests.
//!
//! A [`ProjectPackage`] memoizes its stages for its own lifetime. Callers that
//! want that memoization to outlive one request keep packages in a
//! [`PackageRegistry`], keyed by canonical project root and bounded by capacity.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::build::BuildTool;
use crate::error::PackageError;
use crate::package::ProjectPackage;

pub struct PackageRegistry<B: BuildTool> {
  capacity: usize,
  /// Most recently used last.
  entries: Mutex<VecDeque<(PathBuf, Arc<ProjectPackage<B>>)>>,
}

impl<B: BuildTool> std::fmt::Debug for PackageRegistry<B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PackageRegistry")
      .field("capacity", &self.capacity)
      .field("len", &self.len())
      .finish()
  }
}

impl<B: BuildTool> PackageRegistry<B> {
  /// A registry holding at most `capacity` packages (at least one).
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity: capacity.max(1),
      entries: Mutex::new(VecDeque::new()),
    }
  }

  fn entries(&self) -> MutexGuard<'_, VecDeque<(PathBuf, Arc<ProjectPackage<B>>)>> {
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.entries().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The package for `root`, marking it most recently used.
  pub fn get(&self, root: &Path) -> Option<Arc<ProjectPackage<B>>> {
    let key = dunce::canonicalize(root).ok()?;
    let mut entries = self.entries();
    let index = entries.iter().position(|(path, _)| *path == key)?;
    let entry = entries.remove(index)?;
    let package = entry.1.clone();
    entries.push_back(entry);
    Some(package)
  }

  /// The package for `root`, creating it with `create` when absent.
  ///
  /// Inserting beyond capacity evicts the least recently used package.
  pub fn get_or_insert_with<F>(&self, root: &Path, create: F) -> Result<Arc<ProjectPackage<B>>, PackageError>
  where
    F: FnOnce() -> Result<ProjectPackage<B>, PackageError>,
  {
    if let Some(package) = self.get(root) {
      return Ok(package);
    }

    let package = Arc::new(create()?);
    let key = package.project().root().to_path_buf();

    let mut entries = self.entries();
    // Another caller may have inserted the same root meanwhile. Keep theirs so
    // every caller shares one package.
    if let Some(index) = entries.iter().position(|(path, _)| *path == key)
      && let Some(existing) = entries.remove(index)
    {
      let package = existing.1.clone();
      entries.push_back(existing);
      debug!(root = ?key, "project package was created concurrently, reusing it");
      return Ok(package);
    }
    entries.push_back((key, package.clone()));
    while entries.len() > self.capacity {
      if let Some((evicted, _)) = entries.pop_front() {
        debug!(root = ?evicted, "evicted project package");
      }
    }

    Ok(package)
  }

  /// Drop the package for `root`, returning whether one was held.
  pub fn invalidate(&self, root: &Path) -> bool {
    let Ok(key) = dunce::canonicalize(root) else {
      return false;
    };
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|(path, _)| *path != key);
    entries.len() != before
  }
}
