use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    /// Branch recreated in each checkout for the patch being uploaded.
    pub working_branch: String,
    /// Where HEAD is parked while the working branch is deleted.
    pub scratch_branch: String,
    pub upload_command: Vec<String>,
    /// Token identifying the upload line in the upload tool's stderr.
    pub review_marker: String,
    /// Token identifying the internal review instance on that line.
    pub internal_marker: String,
    pub commit_title: String,
    pub toolchain_dir: String,
    pub toolchain_remote: String,
    pub manifest_dir: String,
    pub manifest_remote: String,
    pub manifest_repo_url: String,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            working_branch: "trybot-work".to_string(),
            scratch_branch: "trybot-scratch".to_string(),
            upload_command: ["repo", "upload", ".", "--cbr", "--no-verify"].map(String::from).to_vec(),
            review_marker: "gerrit".to_string(),
            internal_marker: "gerrit-int".to_string(),
            commit_title: "Toolchain trybot patch".to_string(),
            toolchain_dir: "src/third_party/gcc".to_string(),
            toolchain_remote: "cros".to_string(),
            manifest_dir: "manifest-internal".to_string(),
            manifest_remote: "cros-internal".to_string(),
            manifest_repo_url: "ssh://gerrit-int.chromium.org:29419/chromeos/manifest-versions.git".to_string(),
        }
    }
}
