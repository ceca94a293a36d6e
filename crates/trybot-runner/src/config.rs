use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trybot_artifacts::{ArtifactSettings, InstallSettings};
use trybot_farm::FarmSettings;
use trybot_review::ReviewSettings;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/trybot/trybot.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub review: ReviewSettings,
    pub farm: FarmSettings,
    pub artifacts: ArtifactSettings,
    pub install: InstallSettings,
    pub branches: BranchesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchesConfig {
    /// Requested branch -> toolchain checkout branch, used when neither the
    /// name nor its release number matches a branch directly.
    pub toolchain: BTreeMap<String, String>,
    /// Branch -> image version whose artifacts a build on that branch produces.
    pub pinned_versions: BTreeMap<String, String>,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        Self {
            toolchain: BTreeMap::from([("toolchain-3428.65.B".to_string(), "release-R25-3428.B".to_string())]),
            pinned_versions: BTreeMap::from([("toolchain-3428.65.B".to_string(), "R25-3428.65.1".to_string())]),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).to_string())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Loads `path`, or the default location when `None`. A missing file at
    /// the default location yields the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(p),
            None => {
                let p = Self::default_path();
                if p.exists() {
                    Self::load_from(&p)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn pinned_version(&self, branch: &str) -> Option<&str> {
        self.branches.pinned_versions.get(branch).map(String::as_str)
    }
}
