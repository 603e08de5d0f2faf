//! Single-flight and directory serialization.

use std::sync::Arc;
use std::time::Duration;

use kiln_lib::StageRuns;

use super::common::{CountingFactory, CountingTool, TestProject};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_build() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default().slow(Duration::from_millis(100)));
  let factory = Arc::new(CountingFactory::default());
  let package = Arc::new(project.package_with_factory(tool.clone(), factory.clone()));

  let mut handles = Vec::new();
  for _ in 0..12 {
    let package = package.clone();
    handles.push(tokio::spawn(async move { package.create_workspace().await }));
  }

  let mut workspaces = Vec::new();
  for handle in handles {
    workspaces.push(handle.await.unwrap().unwrap());
  }

  assert_eq!(tool.calls(), 1);
  assert_eq!(factory.conversions(), 1);
  assert_eq!(
    package.stage_runs(),
    StageRuns {
      cache_check: 1,
      build: 1,
      workspace: 1,
    }
  );
  assert!(workspaces.iter().all(|w| Arc::ptr_eq(w, &workspaces[0])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failure_reaches_every_caller() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default().slow(Duration::from_millis(100)));
  tool.fail_with(Some("error K042: unresolved symbol"));
  let package = Arc::new(project.package(tool.clone()));

  let mut handles = Vec::new();
  for _ in 0..6 {
    let package = package.clone();
    handles.push(tokio::spawn(async move { package.create_workspace().await }));
  }

  for handle in handles {
    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_build_failure());
  }
  assert_eq!(tool.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_packages_on_one_directory_build_once() {
  let project = TestProject::new();
  let tool = Arc::new(CountingTool::default().slow(Duration::from_millis(100)));
  let first = project.package(tool.clone());
  let second = project.package(tool.clone());

  let (a, b) = tokio::join!(first.create_workspace(), second.create_workspace());

  a.unwrap();
  b.unwrap();
  assert_eq!(tool.calls(), 1);
}
