//! Status command implementation.
//!
//! Reports whether the last build of a project can be reused, without changing
//! anything on disk.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_lib::inspect_cache;

use super::{load_config, open_project, runtime};
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success, print_warning};

pub fn cmd_status(dir: &Path, project: Option<&str>, config: Option<&Path>, format: OutputFormat) -> Result<()> {
  let config = load_config(config)?;
  let descriptor = open_project(dir, project, &config)?;

  let rt = runtime()?;
  let status = rt
    .block_on(inspect_cache(&descriptor, &config))
    .with_context(|| format!("Failed to inspect build cache of {}", descriptor.name()))?;

  if format.is_json() {
    return print_json(&status);
  }

  if status.verdict.is_reusable() {
    print_success(&format!("{}: previous build is reusable", status.project));
  } else {
    print_info(&format!("{}: rebuild needed ({})", status.project, status.verdict.describe()));
  }

  let log = status
    .build_log
    .as_ref()
    .map(|p| p.display().to_string())
    .unwrap_or_else(|| "none".to_string());
  print_stat("Build log", &log);
  print_stat("Verdict", status.verdict.describe());

  if let Some(error) = &status.last_build_error {
    println!();
    print_warning("Last build failed:");
    for line in error.lines() {
      println!("    {line}");
    }
  }

  Ok(())
}
