//! Build pipeline configuration.
//!
//! Every field has a default, so an absent config file or a partial one is valid.
//! Environment variables are applied on top of whatever the file provides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{
  BUILD_LOG_EXTENSION, BUILD_LOG_FILE_NAME, INTERMEDIATE_DIRS, LOCK_FILE_NAME, PROJECT_EXTENSION, SENTINEL_FILE_NAME,
};

/// Placeholder replaced with the project file path in build arguments.
pub const PROJECT_PLACEHOLDER: &str = "{project}";

/// Placeholder replaced with the build-log file name in build arguments.
pub const LOG_PLACEHOLDER: &str = "{log}";

pub const ENV_BUILD_COMMAND: &str = "KILN_BUILD_COMMAND";
pub const ENV_PROJECT_EXTENSION: &str = "KILN_PROJECT_EXTENSION";
pub const ENV_LOCK_TIMEOUT: &str = "KILN_LOCK_TIMEOUT";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("invalid value for {var}: {message}")]
  InvalidEnv { var: &'static str, message: String },
}

/// The external build tool invocation.
///
/// `args` may contain [`PROJECT_PLACEHOLDER`] and [`LOG_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCommand {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
}

impl Default for BuildCommand {
  fn default() -> Self {
    Self {
      program: "kiln-build".to_string(),
      args: vec![
        PROJECT_PLACEHOLDER.to_string(),
        "--log".to_string(),
        LOG_PLACEHOLDER.to_string(),
      ],
    }
  }
}

impl BuildCommand {
  /// Parse a whitespace separated command line, e.g. `make -C {project}`.
  pub fn parse(line: &str) -> Option<Self> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some(Self {
      program,
      args: parts.collect(),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
  pub project_extension: String,
  pub build_log_extension: String,
  pub build_log_file_name: String,
  pub sentinel_file_name: String,
  pub lock_file_name: String,
  pub intermediate_dirs: Vec<String>,
  pub build_command: BuildCommand,
  /// How long to wait for another process holding the directory lock.
  #[serde(with = "duration_str")]
  pub lock_timeout: Duration,
  /// How long to wait for a freshly written build log to become readable.
  #[serde(with = "duration_str")]
  pub log_ready_timeout: Duration,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      project_extension: PROJECT_EXTENSION.to_string(),
      build_log_extension: BUILD_LOG_EXTENSION.to_string(),
      build_log_file_name: BUILD_LOG_FILE_NAME.to_string(),
      sentinel_file_name: SENTINEL_FILE_NAME.to_string(),
      lock_file_name: LOCK_FILE_NAME.to_string(),
      intermediate_dirs: INTERMEDIATE_DIRS.iter().map(|d| d.to_string()).collect(),
      build_command: BuildCommand::default(),
      lock_timeout: Duration::from_secs(300),
      log_ready_timeout: Duration::from_secs(10),
    }
  }
}

impl BuildConfig {
  /// Load configuration from an optional JSON file, then apply environment overrides.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let config = match path {
      Some(path) => Self::from_file(path)?,
      None => Self::default(),
    };
    config.with_env_overrides()
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
  }

  pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
    if let Ok(line) = std::env::var(ENV_BUILD_COMMAND) {
      self.build_command = BuildCommand::parse(&line).ok_or(ConfigError::InvalidEnv {
        var: ENV_BUILD_COMMAND,
        message: "command is empty".to_string(),
      })?;
    }

    if let Ok(extension) = std::env::var(ENV_PROJECT_EXTENSION) {
      self.project_extension = extension.trim_start_matches('.').to_string();
    }

    if let Ok(timeout) = std::env::var(ENV_LOCK_TIMEOUT) {
      self.lock_timeout = humantime::parse_duration(&timeout).map_err(|e| ConfigError::InvalidEnv {
        var: ENV_LOCK_TIMEOUT,
        message: e.to_string(),
      })?;
    }

    Ok(self)
  }
}

mod duration_str {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
  }
}
