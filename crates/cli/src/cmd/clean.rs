use std::path::Path;

use anyhow::{Context, Result};

use kiln_lib::clean_project;

use super::{load_config, open_project, runtime};
use crate::output::{OutputFormat, print_info, print_json, print_success, symbols};

pub fn cmd_clean(
  dir: &Path,
  project: Option<&str>,
  config: Option<&Path>,
  format: OutputFormat,
  verbose: bool,
) -> Result<()> {
  let config = load_config(config)?;
  let descriptor = open_project(dir, project, &config)?;

  let rt = runtime()?;
  let report = rt
    .block_on(clean_project(&descriptor, &config))
    .with_context(|| format!("Failed to clean {}", descriptor.name()))?;

  if format.is_json() {
    return print_json(&report);
  }

  if report.removed.is_empty() {
    print_info("Nothing to clean");
    return Ok(());
  }

  print_success(&format!("Removed {} item(s) from {}", report.removed.len(), descriptor.name()));
  if verbose {
    for path in &report.removed {
      println!("  {} {}", symbols::REMOVE, path.display());
    }
  }

  Ok(())
}
