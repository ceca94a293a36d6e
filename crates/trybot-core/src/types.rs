use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, ids::PatchId};

pub const DEFAULT_BRANCH: &str = "master";
pub const NO_PATCH: &str = "NO_PATCH";

/// A build-farm target such as `lumpy-release`. The board is the part before
/// the first `-`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target(String);

impl Target {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let board = raw.split('-').next().unwrap_or_default();
        if board.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidTarget(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn board(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locality {
    Remote,
    Local { dest_dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub target: Target,
    pub branch: String,
    pub patches: Vec<PatchId>,
    pub chrome_version: Option<String>,
    pub locality: Locality,
}

impl BuildRequest {
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::derive(&self.branch, &self.patches, &self.target)
    }
}

/// Joins patch ids with `+`, or `NO_PATCH` for an empty list.
pub fn patch_string(patches: &[PatchId]) -> String {
    if patches.is_empty() {
        return NO_PATCH.to_string();
    }
    patches.iter().map(PatchId::as_str).collect::<Vec<_>>().join("+")
}

/// The description embedded in a build request and matched against the
/// `reason` field of status records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn derive(branch: &str, patches: &[PatchId], target: &Target) -> Self {
        Self(format!("{}_{}_{}", branch, patch_string(patches), target.as_str()))
    }

    /// Wraps a key that was produced elsewhere, e.g. by an earlier submission.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a build-farm status report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u64,
    pub completed: bool,
    pub result: i64,
    pub reason: String,
}

impl BuildRecord {
    pub fn matches(&self, key: &CorrelationKey) -> bool {
        self.reason.contains(key.as_str())
    }

    pub fn succeeded(&self) -> bool {
        self.completed && self.result == 0
    }
}
