//! Test utilities for kiln-lib.
//!
//! Helpers for tests that need a build tool: a shell command line for the real
//! [`CommandBuildTool`](crate::build::CommandBuildTool) and an in-process fake
//! that records how often it ran.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::build::{BuildError, BuildOutput, BuildRequest, BuildTool};
use crate::build_log::{AnalysisResult, BuildLog};
use crate::config::BuildCommand;

/// A build command that runs `script` through the platform shell.
#[cfg(unix)]
pub fn shell_command(script: &str) -> BuildCommand {
  BuildCommand {
    program: "/bin/sh".to_string(),
    args: vec!["-c".to_string(), script.to_string()],
  }
}

#[cfg(windows)]
pub fn shell_command(script: &str) -> BuildCommand {
  BuildCommand {
    program: "cmd.exe".to_string(),
    args: vec!["/C".to_string(), script.to_string()],
  }
}

/// A successful, fully compiled result for `project_file`.
pub fn compiled_result(project_file: &Path, references: &[&str]) -> AnalysisResult {
  let root = project_file.parent().unwrap_or(project_file);
  AnalysisResult {
    project_file_path: project_file.to_path_buf(),
    succeeded: true,
    source_files: vec![root.join("main.src")],
    compile_inputs: vec![root.join("main.src"), root.join("app.rsp")],
    references: references.iter().map(PathBuf::from).collect(),
  }
}

/// Write a build log holding `projects` to `path`.
pub fn write_build_log(path: &Path, projects: Vec<AnalysisResult>) {
  let content = serde_json::to_string_pretty(&BuildLog::new(projects)).unwrap();
  std::fs::write(path, content).unwrap();
}

#[derive(Debug, Clone)]
pub enum FakeBehavior {
  /// Exit 0 and write a compiled result carrying these references.
  Succeed(Vec<String>),
  /// Exit 1 with this stderr and write nothing.
  Fail(String),
  /// Exit 0 without writing a build log.
  NoLog,
  /// Exit 0 and write a log with no projects.
  EmptyLog,
  /// Exit 0 but record the project as failed.
  Unsuccessful,
}

/// In-process build tool counting its invocations.
#[derive(Debug)]
pub struct FakeBuildTool {
  calls: AtomicUsize,
  behavior: Mutex<FakeBehavior>,
}

impl FakeBuildTool {
  pub fn new(behavior: FakeBehavior) -> Self {
    Self {
      calls: AtomicUsize::new(0),
      behavior: Mutex::new(behavior),
    }
  }

  pub fn succeeding(references: &[&str]) -> Self {
    Self::new(FakeBehavior::Succeed(references.iter().map(|r| r.to_string()).collect()))
  }

  pub fn set_behavior(&self, behavior: FakeBehavior) {
    *self.behavior.lock().unwrap() = behavior;
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl BuildTool for FakeBuildTool {
  async fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
    self.calls.fetch_add(1, Ordering::SeqCst);

    let behavior = self.behavior.lock().unwrap().clone();
    let log_path = request.root.join(&request.log_file_name);
    let project_file = request
      .project_file
      .clone()
      .unwrap_or_else(|| request.root.join("unknown.kproj"));

    let ok = BuildOutput {
      exit_code: Some(0),
      ..BuildOutput::default()
    };

    match behavior {
      FakeBehavior::Succeed(references) => {
        let refs: Vec<&str> = references.iter().map(String::as_str).collect();
        write_build_log(&log_path, vec![compiled_result(&project_file, &refs)]);
        Ok(ok)
      }
      FakeBehavior::Fail(stderr) => Ok(BuildOutput {
        exit_code: Some(1),
        stdout: String::new(),
        stderr,
      }),
      FakeBehavior::NoLog => Ok(ok),
      FakeBehavior::EmptyLog => {
        write_build_log(&log_path, vec![]);
        Ok(ok)
      }
      FakeBehavior::Unsuccessful => {
        let mut result = compiled_result(&project_file, &[]);
        result.succeeded = false;
        write_build_log(&log_path, vec![result]);
        Ok(ok)
      }
    }
  }
}
