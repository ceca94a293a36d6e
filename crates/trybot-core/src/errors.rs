use std::path::PathBuf;

use thiserror::Error;

/// Problems with the invocation itself. These are raised before the
/// orchestration touches any external system.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chromeos version and branch cannot both be set (branch={branch}, version={version})")]
    BranchAndVersion { branch: String, version: String },

    #[error("invalid target {0:?}: expected <board>-<config>")]
    InvalidTarget(String),

    #[error("invalid version {0:?}")]
    InvalidVersion(String),

    #[error("manifest for version {0} is not available")]
    ManifestNotFound(String),

    #[error("the branch/version {0} is not a valid one")]
    UnknownBranch(String),

    #[error("{what} does not exist: {path}")]
    MissingPath { what: &'static str, path: PathBuf },

    #[error("--local requires --dest-dir")]
    LocalWithoutDest,
}
