use serde::{Deserialize, Serialize};
use trybot_core::{Backoff, DEFAULT_BRANCH};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmSettings {
    /// Directory of the build-farm driver, relative to the chromeos root.
    pub driver_dir: String,
    pub driver: String,
    /// Branch that needs no `-b` flag.
    pub default_branch: String,
    /// Command printing the build-farm status report.
    pub status_command: Vec<String>,
    pub poll: PollSettings,
}

impl Default for FarmSettings {
    fn default() -> Self {
        Self {
            driver_dir: "chromite/buildbot".to_string(),
            driver: "./cbuildbot".to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            status_command: ["buildbot_json.py", "builds", "http://chromegw/p/tryserver.chromiumos/"]
                .map(String::from)
                .to_vec(),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub backoff: Backoff,
    /// Give up after this many seconds. Unset means wait forever.
    pub deadline_secs: Option<u64>,
}
