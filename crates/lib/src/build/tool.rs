//! The external build tool.
//!
//! The pipeline treats the compiler as an opaque process: it is handed a project
//! path and the name of the build log to write, and reports an exit code plus
//! whatever it printed.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::BuildError;
use crate::config::{BuildCommand, LOG_PLACEHOLDER, PROJECT_PLACEHOLDER};

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  /// Working directory of the build.
  pub root: PathBuf,
  /// Project file to build. `None` lets the tool discover the project itself.
  pub project_file: Option<PathBuf>,
  /// Build-log file name relative to `root`.
  pub log_file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
  pub exit_code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl BuildOutput {
  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }

  /// Error text to persist after a failed build: stderr lines, or stdout when stderr is empty.
  pub fn diagnostics(&self) -> String {
    let text = if self.stderr.trim().is_empty() {
      &self.stdout
    } else {
      &self.stderr
    };
    text.lines().collect::<Vec<_>>().join(LINE_ENDING)
  }
}

pub trait BuildTool: Send + Sync + 'static {
  fn build(&self, request: &BuildRequest) -> impl Future<Output = Result<BuildOutput, BuildError>> + Send;
}

/// Runs a configured command line as the build tool.
#[derive(Debug, Clone, Default)]
pub struct CommandBuildTool {
  command: BuildCommand,
}

impl CommandBuildTool {
  pub fn new(command: BuildCommand) -> Self {
    Self { command }
  }

  /// Arguments with placeholders substituted.
  ///
  /// Arguments mentioning the project are dropped when there is no project file.
  fn expand_args(&self, request: &BuildRequest) -> Vec<String> {
    self
      .command
      .args
      .iter()
      .filter_map(|arg| {
        let arg = if arg.contains(PROJECT_PLACEHOLDER) {
          let project = request.project_file.as_ref()?;
          arg.replace(PROJECT_PLACEHOLDER, &project.to_string_lossy())
        } else {
          arg.clone()
        };
        Some(arg.replace(LOG_PLACEHOLDER, &request.log_file_name))
      })
      .collect()
  }
}

impl BuildTool for CommandBuildTool {
  async fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
    let args = self.expand_args(request);
    info!(program = %self.command.program, args = ?args, root = ?request.root, "invoking build tool");

    let output = Command::new(&self.command.program)
      .args(&args)
      .current_dir(&request.root)
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|source| BuildError::Spawn {
        program: self.command.program.clone(),
        source,
      })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "build tool stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "build tool stdout");
    }

    Ok(BuildOutput {
      exit_code: output.status.code(),
      stdout,
      stderr,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::shell_command;
  use tempfile::TempDir;

  fn request(root: PathBuf, project_file: Option<PathBuf>) -> BuildRequest {
    BuildRequest {
      root,
      project_file,
      log_file_name: "full.buildlog".to_string(),
    }
  }

  #[test]
  fn expand_args_substitutes_placeholders() {
    let tool = CommandBuildTool::new(BuildCommand {
      program: "tool".to_string(),
      args: vec!["{project}".to_string(), "--log={log}".to_string()],
    });

    let args = tool.expand_args(&request(PathBuf::from("/w"), Some(PathBuf::from("/w/app.kproj"))));
    assert_eq!(args, vec!["/w/app.kproj", "--log=full.buildlog"]);
  }

  #[test]
  fn expand_args_drops_project_without_project_file() {
    let tool = CommandBuildTool::default();

    let args = tool.expand_args(&request(PathBuf::from("/w"), None));
    assert_eq!(args, vec!["--log", "full.buildlog"]);
  }

  #[test]
  fn diagnostics_prefer_stderr() {
    let output = BuildOutput {
      exit_code: Some(1),
      stdout: "progress".to_string(),
      stderr: "error one\nerror two\n".to_string(),
    };
    assert_eq!(output.diagnostics(), format!("error one{LINE_ENDING}error two"));
  }

  #[test]
  fn diagnostics_fall_back_to_stdout() {
    let output = BuildOutput {
      exit_code: Some(1),
      stdout: "only stdout".to_string(),
      stderr: "  ".to_string(),
    };
    assert_eq!(output.diagnostics(), "only stdout");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn command_runs_in_project_root() {
    let temp = TempDir::new().unwrap();
    let tool = CommandBuildTool::new(shell_command("echo built > {log}"));

    let output = tool.build(&request(temp.path().to_path_buf(), None)).await.unwrap();

    assert!(output.success());
    let written = std::fs::read_to_string(temp.path().join("full.buildlog")).unwrap();
    assert_eq!(written.trim(), "built");
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn failing_command_reports_exit_code_and_stderr() {
    let temp = TempDir::new().unwrap();
    let tool = CommandBuildTool::new(shell_command("echo broken >&2; exit 3"));

    let output = tool.build(&request(temp.path().to_path_buf(), None)).await.unwrap();

    assert!(!output.success());
    assert_eq!(output.exit_code, Some(3));
    assert_eq!(output.stderr.trim(), "broken");
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let tool = CommandBuildTool::new(BuildCommand {
      program: "kiln-definitely-not-installed".to_string(),
      args: vec![],
    });

    let err = tool.build(&request(temp.path().to_path_buf(), None)).await.unwrap_err();
    assert!(matches!(err, BuildError::Spawn { .. }));
  }
}
