//! Well-known names shared by the library and the CLI.

/// File the build tool is asked to write its build log to, relative to the project root.
pub const BUILD_LOG_FILE_NAME: &str = "kiln_full_build.buildlog";

/// Extension identifying build-log artifacts.
pub const BUILD_LOG_EXTENSION: &str = "buildlog";

/// Extension identifying project files.
pub const PROJECT_EXTENSION: &str = "kproj";

/// Holds the diagnostic text of the last failed build. Removed after the next success.
pub const SENTINEL_FILE_NAME: &str = ".kiln-builderror";

pub const LOCK_FILE_NAME: &str = ".kiln-lock";

/// Intermediate output directories removed when a cached build is invalidated.
pub const INTERMEDIATE_DIRS: &[&str] = &["obj"];

/// Build-log format version understood by the loader.
pub const BUILD_LOG_VERSION: u32 = 1;
