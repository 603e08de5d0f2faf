//! kiln-lib: cache-aware build pipeline for project directories
//!
//! This crate turns a project directory into a code-model workspace while
//! avoiding redundant builds:
//! - `ProjectPackage`: the three-stage pipeline (cache check, build, workspace)
//! - `PipelineStage`: memoized, single-flight async stages
//! - `DirectoryLocks`: serialized access to a project directory, in and across processes
//! - `BuildTool`: the external compiler, invoked as an opaque process

pub mod build;
pub mod build_log;
pub mod cache;
pub mod config;
pub mod consts;
pub mod dir_lock;
pub mod directory;
pub mod error;
pub mod package;
pub mod project;
pub mod registry;
pub mod stage;
pub mod util;
pub mod workspace;

pub use build::{BuildError, BuildTool, CommandBuildTool};
pub use build_log::AnalysisResult;
pub use cache::{CacheStatus, CacheVerdict, CleanReport, clean_project, inspect_cache};
pub use config::BuildConfig;
pub use dir_lock::DirectoryLocks;
pub use error::PackageError;
pub use package::{ProjectPackage, StageRuns};
pub use project::ProjectDescriptor;
pub use registry::PackageRegistry;
pub use stage::PipelineStage;
pub use workspace::{CodeModelWorkspace, DefaultWorkspaceFactory, WorkspaceFactory};
