use serde::{Deserialize, Serialize};
use trybot_core::ArtifactSet;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// Object-store client used for `ls` and `cp`.
    pub store_command: String,
    pub bucket: String,
    /// Object-name substrings that must all be downloaded.
    pub names: Vec<String>,
    /// Extra attempts per object before a download counts as failed.
    pub download_retries: u32,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            store_command: "gsutil".to_string(),
            bucket: "gs://chromeos-image-archive".to_string(),
            names: ArtifactSet::default().names().to_vec(),
            download_retries: 0,
        }
    }
}

impl ArtifactSettings {
    pub fn artifact_set(&self) -> ArtifactSet {
        ArtifactSet::new(self.names.iter().cloned())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Run sysroot moves and removals through `sudo`.
    pub use_sudo: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self { use_sudo: true }
    }
}
