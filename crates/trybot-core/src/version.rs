use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static VERSION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*-\d+\.\d+\.\d+)").expect("valid version pattern"));
static RELEASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(R\d+)").expect("valid release pattern"));

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version {0:?} does not contain <product>-<major>.<minor>.<patch>")]
    Malformed(String),
    #[error("version {0:?} has no numeric part after '-'")]
    NoNumber(String),
}

/// Trims a version down to its leading `<product>-<major>.<minor>.<patch>`,
/// e.g. `foo-1.2.3-rc1` becomes `foo-1.2.3`.
pub fn normalize_version(version: &str) -> Result<String, VersionError> {
    VERSION_PREFIX
        .captures(version)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| VersionError::Malformed(version.to_string()))
}

/// The part of an OS version after the first `-` (`R25-3428.65.1` gives
/// `3428.65.1`). Manifest files are named by this number.
pub fn version_number(version: &str) -> Result<&str, VersionError> {
    match version.split_once('-') {
        Some((_, rest)) if !rest.is_empty() => Ok(rest),
        _ => Err(VersionError::NoNumber(version.to_string())),
    }
}

/// Release milestone (`R25`) embedded in a branch or version name.
pub fn release_number(name: &str) -> Option<String> {
    RELEASE.captures(name).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}
