use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use trybot_core::{normalize_version, Target};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::{
    settings::ArtifactSettings,
    steps::{Step, StepPlan},
};

/// The build farm's object store, reached through its command-line client.
pub struct ArtifactStore<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a ArtifactSettings,
}

impl<'a> ArtifactStore<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: &'a ArtifactSettings) -> Self {
        Self { runner, settings }
    }

    fn target_dir(&self, target: &Target) -> String {
        format!("{}/trybot-{}", self.settings.bucket.trim_end_matches('/'), target)
    }

    /// `<bucket>/trybot-<target>/<version>-b<number>`
    pub fn build_dir(&self, target: &Target, version: &str, number: u64) -> String {
        format!("{}/{}-b{}", self.target_dir(target), version, number)
    }

    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        let spec = CommandSpec::new(self.settings.store_command.as_str()).arg("ls").arg(path);
        let out = self.runner.run_checked(&spec).with_context(|| format!("list {path}"))?;
        Ok(out.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    pub fn download(&self, object: &str, dest: &Path) -> Result<()> {
        let spec = CommandSpec::new(self.settings.store_command.as_str())
            .arg("cp")
            .arg(object)
            .path_arg(dest)
            .echo_output();
        self.runner.run_checked(&spec).with_context(|| format!("download {object}"))?;
        Ok(())
    }

    /// Finds the image version of build `number` by listing the target's
    /// directory for an entry ending in `-b<number>`.
    pub fn discover_version(&self, target: &Target, number: u64) -> Result<String> {
        let suffix = format!("-b{number}");
        let entries = self.list(&format!("{}/", self.target_dir(target)))?;
        entries
            .iter()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| e.ends_with(suffix.as_str()))
            .filter_map(|e| e.rsplit('/').next())
            .filter_map(|name| name.strip_suffix(suffix.as_str()))
            .find(|v| !v.is_empty())
            .map(String::from)
            .ok_or_else(|| anyhow!("no artifacts for build {number} under {}", self.target_dir(target)))
    }
}

/// Downloads every artifact of build `number` into `dest` and returns the
/// local paths. Fails before downloading anything if the listing lacks one
/// of the required artifacts, and on the first download that still fails
/// after `download_retries` extra attempts.
pub fn fetch_artifacts(
    store: &ArtifactStore<'_>,
    target: &Target,
    number: u64,
    dest: &Path,
    version: &str,
) -> Result<Vec<PathBuf>> {
    let version = normalize_version(version)?;
    std::fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;

    let dir = store.build_dir(target, &version, number);
    let set = store.settings.artifact_set();
    let objects = store.list(&dir)?;
    let wanted: Vec<&str> = objects.iter().map(String::as_str).filter(|o| set.wants(o)).collect();
    let missing = set.missing(&wanted);
    if !missing.is_empty() {
        bail!("build {number} at {dir} is missing artifacts: {}", missing.join(", "));
    }

    let fetched: Vec<PathBuf> = wanted.iter().map(|o| dest.join(object_name(o))).collect();
    let retries = store.settings.download_retries;
    let mut plan = StepPlan::new("fetch");
    for object in wanted {
        plan = plan.step(
            Step::new(format!("download {}", object_name(object)), move || {
                info!(object, dest = %dest.display(), "download");
                store.download(object, dest)
            })
            .with_retries(retries),
        );
    }
    plan.run()?;
    Ok(fetched)
}

fn object_name(object: &str) -> &str {
    object.rsplit('/').next().unwrap_or(object)
}
