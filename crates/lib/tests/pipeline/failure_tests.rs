//! Build failures and the sentinel file.

use std::sync::Arc;

use kiln_lib::{BuildError, PackageError, ProjectPackage};

use super::common::{CountingTool, TestProject};

#[tokio::test]
async fn failed_build_leaves_diagnostics_until_next_success() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default());
  tool.fail_with(Some("error K001: missing semicolon\nerror K002: unknown name"));

  let err = project.package(tool.clone()).create_workspace().await.unwrap_err();

  match err {
    PackageError::BuildFailed(inner) => assert!(matches!(*inner, BuildError::ToolFailed { code: Some(2), .. })),
    other => panic!("expected build failure, got {other:?}"),
  }
  let diagnostics = std::fs::read_to_string(project.sentinel_path()).unwrap();
  assert!(diagnostics.contains("K001"));
  assert!(diagnostics.contains("K002"));

  tool.fail_with(None);
  project.package(tool.clone()).create_workspace().await.unwrap();

  assert!(!project.sentinel_path().exists());
  assert_eq!(tool.calls(), 2);
}

#[tokio::test]
async fn failure_is_not_memoized() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default());
  tool.fail_with(Some("broken"));
  let package = project.package(tool.clone());

  assert!(package.create_workspace().await.is_err());
  tool.fail_with(None);

  package.create_workspace_for_run().await.unwrap();
  assert_eq!(tool.calls(), 2);
}

#[tokio::test]
async fn ambiguous_project_is_a_configuration_error() {
  let project = TestProject::new();
  std::fs::write(project.root().join("second.kproj"), "").unwrap();

  let err = ProjectPackage::open(
    project.temp.path(),
    None,
    project.locks.clone(),
    Arc::new(CountingTool::default()),
    project.config.clone(),
  )
  .unwrap_err();

  assert!(matches!(err, PackageError::Configuration(_)));
}

#[tokio::test]
async fn explicit_project_name_resolves_ambiguity() {
  let project = TestProject::new();
  std::fs::write(project.root().join("second.kproj"), "").unwrap();
  let tool = Arc::new(CountingTool::default());

  let package = ProjectPackage::open(
    project.temp.path(),
    Some("app.kproj"),
    project.locks.clone(),
    tool.clone(),
    project.config.clone(),
  )
  .unwrap();

  assert_eq!(package.name(), "app.kproj");
  package.create_workspace().await.unwrap();
  assert_eq!(tool.calls(), 1);
}
