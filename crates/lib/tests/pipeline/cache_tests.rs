//! Cache reuse and invalidation.

use std::path::PathBuf;
use std::sync::Arc;

use super::common::{CountingTool, TestProject, compiled, write_log};

#[tokio::test]
async fn first_request_builds_exactly_once() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::with_references(&["/refs/core.ref"]));
  let package = project.package(tool.clone());

  let workspace = package.create_workspace().await.unwrap();

  assert_eq!(tool.calls(), 1);
  assert_eq!(package.build_was_reused(), Some(false));
  let solution = workspace.solution();
  assert_eq!(solution.projects()[0].project_file_path, project.project_file());
  assert!(project.log_path().exists());
}

#[tokio::test]
async fn reusable_log_skips_the_build() {
  let project = TestProject::new();
  let previous = compiled(&project.project_file(), &["/refs/core.ref"]);
  write_log(&project.log_path(), vec![previous.clone()]);
  let tool = Arc::new(CountingTool::default());
  let package = project.package(tool.clone());

  let workspace = package.create_workspace().await.unwrap();

  assert_eq!(tool.calls(), 0);
  assert_eq!(package.build_was_reused(), Some(true));
  assert_eq!(*package.build_result().await.unwrap(), previous);
  assert_eq!(workspace.solution().projects()[0].metadata_references.len(), 1);
}

#[tokio::test]
async fn log_without_compile_inputs_is_cleaned_and_rebuilt() {
  let project = TestProject::new();
  let mut skipped = compiled(&project.project_file(), &[]);
  skipped.compile_inputs.clear();
  write_log(&project.log_path(), vec![skipped]);
  let obj = project.intermediate_output();
  let tool = Arc::new(CountingTool::default());
  let package = project.package(tool.clone());

  package.create_workspace().await.unwrap();

  assert_eq!(tool.calls(), 1);
  assert!(!obj.exists());
  let rebuilt = package.build_result().await.unwrap();
  assert!(!rebuilt.compile_inputs.is_empty());
}

#[tokio::test]
async fn workspace_carries_every_reference() {
  let project = TestProject::new();
  let references = ["/refs/a.ref", "/refs/b.ref", "/refs/c.ref"];
  let tool = Arc::new(CountingTool::with_references(&references));
  let package = project.package(tool);

  let workspace = package.create_workspace_for_language_services().await.unwrap();

  let solution = workspace.solution();
  let carried: Vec<PathBuf> = solution.projects()[0]
    .metadata_references
    .iter()
    .map(|r| r.path.clone())
    .collect();
  let expected: Vec<PathBuf> = references.iter().map(PathBuf::from).collect();
  assert_eq!(carried, expected);
  assert!(workspace.warnings().is_empty());
}

#[tokio::test]
async fn completed_pipeline_does_not_touch_the_filesystem_again() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default());
  let package = project.package(tool.clone());

  let first = package.create_workspace().await.unwrap();
  std::fs::remove_file(project.log_path()).unwrap();
  let second = package.create_workspace().await.unwrap();

  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(tool.calls(), 1);
  assert!(!project.log_path().exists());
}

#[tokio::test]
async fn new_package_reuses_previous_build() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default());

  project.package(tool.clone()).create_workspace().await.unwrap();
  let second = project.package(tool.clone());
  second.create_workspace().await.unwrap();

  assert_eq!(tool.calls(), 1);
  assert_eq!(second.build_was_reused(), Some(true));
}
