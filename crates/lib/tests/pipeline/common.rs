//! Shared helpers for pipeline integration tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kiln_lib::build::{BuildError, BuildOutput, BuildRequest, BuildTool};
use kiln_lib::build_log::BuildLog;
use kiln_lib::directory::ProjectDirectory;
use kiln_lib::workspace::Workspace;
use kiln_lib::{
  AnalysisResult, BuildConfig, DefaultWorkspaceFactory, DirectoryLocks, ProjectDescriptor, ProjectPackage,
  WorkspaceFactory,
};
use tempfile::TempDir;

pub const PROJECT_FILE: &str = "app.kproj";

/// Build tool double that writes a build log and counts invocations.
#[derive(Debug, Default)]
pub struct CountingTool {
  calls: AtomicUsize,
  failure: Mutex<Option<String>>,
  references: Vec<String>,
  delay: Duration,
}

impl CountingTool {
  pub fn with_references(references: &[&str]) -> Self {
    Self {
      references: references.iter().map(|r| r.to_string()).collect(),
      ..Self::default()
    }
  }

  pub fn slow(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Fail every following build with `stderr`; `None` succeeds again.
  pub fn fail_with(&self, stderr: Option<&str>) {
    *self.failure.lock().unwrap() = stderr.map(str::to_string);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl BuildTool for CountingTool {
  async fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;

    let failure = self.failure.lock().unwrap().clone();
    if let Some(stderr) = failure {
      return Ok(BuildOutput {
        exit_code: Some(2),
        stdout: String::new(),
        stderr,
      });
    }

    let project_file = request.project_file.clone().expect("project file exists");
    let refs: Vec<&str> = self.references.iter().map(String::as_str).collect();
    write_log(
      &request.root.join(&request.log_file_name),
      vec![compiled(&project_file, &refs)],
    );
    Ok(BuildOutput {
      exit_code: Some(0),
      ..BuildOutput::default()
    })
  }
}

/// Workspace factory counting its conversions.
#[derive(Debug, Default)]
pub struct CountingFactory {
  conversions: AtomicUsize,
}

impl CountingFactory {
  pub fn conversions(&self) -> usize {
    self.conversions.load(Ordering::SeqCst)
  }
}

impl WorkspaceFactory for CountingFactory {
  fn create(&self, result: &AnalysisResult) -> Option<Workspace> {
    self.conversions.fetch_add(1, Ordering::SeqCst);
    DefaultWorkspaceFactory.create(result)
  }
}

/// A project directory containing a single project file.
pub struct TestProject {
  pub temp: TempDir,
  pub locks: Arc<DirectoryLocks>,
  pub config: Arc<BuildConfig>,
}

impl TestProject {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(PROJECT_FILE), "").unwrap();
    std::fs::write(temp.path().join("main.src"), "fn main").unwrap();
    Self {
      temp,
      locks: Arc::new(DirectoryLocks::new()),
      config: Arc::new(BuildConfig::default()),
    }
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  pub fn project_file(&self) -> PathBuf {
    self.root().join(PROJECT_FILE)
  }

  pub fn log_path(&self) -> PathBuf {
    self.root().join(&self.config.build_log_file_name)
  }

  pub fn sentinel_path(&self) -> PathBuf {
    self.root().join(&self.config.sentinel_file_name)
  }

  /// Create `obj/` with some content, returning its path.
  pub fn intermediate_output(&self) -> PathBuf {
    let obj = self.root().join("obj");
    std::fs::create_dir_all(obj.join("release")).unwrap();
    std::fs::write(obj.join("release").join("app.o"), "object").unwrap();
    obj
  }

  pub fn package(&self, tool: Arc<CountingTool>) -> ProjectPackage<CountingTool> {
    ProjectPackage::open(self.temp.path(), None, self.locks.clone(), tool, self.config.clone()).unwrap()
  }

  pub fn package_with_factory(
    &self,
    tool: Arc<CountingTool>,
    factory: Arc<CountingFactory>,
  ) -> ProjectPackage<CountingTool> {
    let directory = ProjectDirectory::new(self.temp.path(), self.locks.clone(), &self.config).unwrap();
    let project = ProjectDescriptor::new(directory, None, &self.config).unwrap();
    ProjectPackage::with_factory(project, tool, factory, self.config.clone())
  }
}

/// A successful result that compiled one source file.
pub fn compiled(project_file: &Path, references: &[&str]) -> AnalysisResult {
  let root = project_file.parent().unwrap();
  AnalysisResult {
    project_file_path: project_file.to_path_buf(),
    succeeded: true,
    source_files: vec![root.join("main.src")],
    compile_inputs: vec![root.join("main.src")],
    references: references.iter().map(PathBuf::from).collect(),
  }
}

pub fn write_log(path: &Path, projects: Vec<AnalysisResult>) {
  std::fs::write(path, serde_json::to_string(&BuildLog::new(projects)).unwrap()).unwrap();
}
