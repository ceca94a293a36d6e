use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{error, info};
use trybot_artifacts::{fetch_artifacts, install_sysroot, unpack_artifacts, ArtifactStore, SysrootLayout};
use trybot_core::{
    normalize_version, BuildRequest, ConfigError, CorrelationKey, Locality, PatchId, PollOutcome, Target,
    DEFAULT_BRANCH,
};
use trybot_exec::CommandRunner;
use trybot_farm::{submit, CancelToken, Clock, CommandStatusSource, PollPolicy, Poller};
use trybot_review::{manifest_patch, upload_toolchain_patch};

use crate::Config;

/// One `trybot run` invocation.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub chromeos_root: PathBuf,
    pub target: String,
    /// Local toolchain tree to upload as a patch.
    pub gcc_dir: Option<PathBuf>,
    pub branch: Option<String>,
    /// Already-uploaded patches, applied before any generated ones.
    pub patches: Vec<PatchId>,
    pub local: bool,
    pub dest_dir: Option<PathBuf>,
    pub chrome_version: Option<String>,
    pub chromeos_version: Option<String>,
    pub replace_sysroot: bool,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub key: CorrelationKey,
    pub patches: Vec<PatchId>,
    /// `None` when the run stopped after submission.
    pub outcome: Option<PollOutcome>,
    pub artifacts: Vec<PathBuf>,
    pub sysroot: Option<SysrootLayout>,
}

/// Result of fetching (and maybe installing) one finished build.
#[derive(Clone, Debug)]
pub struct Staged {
    pub version: String,
    pub artifacts: Vec<PathBuf>,
    pub sysroot: Option<SysrootLayout>,
}

/// Drives a build through patch upload, submission, polling and staging.
pub struct RemoteBuild<'a> {
    cfg: &'a Config,
    runner: &'a dyn CommandRunner,
    clock: &'a dyn Clock,
    cancel: CancelToken,
}

impl<'a> RemoteBuild<'a> {
    pub fn new(cfg: &'a Config, runner: &'a dyn CommandRunner, clock: &'a dyn Clock, cancel: CancelToken) -> Self {
        Self { cfg, runner, clock, cancel }
    }

    pub fn run(&self, opts: &RunOptions) -> Result<RunReport> {
        let (target, locality) = validate(opts)?;
        let root = opts.chromeos_root.as_path();
        let branch = opts.branch.clone().unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        let mut patches = opts.patches.clone();
        if let Some(version) = &opts.chromeos_version {
            let id = manifest_patch(self.runner, &self.cfg.review, root, version, &branch)?;
            info!(patch = %id, internal = id.is_internal(), version = %version, "manifest patch uploaded");
            patches.push(id);
        }
        if let Some(gcc_dir) = &opts.gcc_dir {
            let source_branch = opts.branch.as_deref().or(opts.chromeos_version.as_deref()).unwrap_or(DEFAULT_BRANCH);
            let id = upload_toolchain_patch(
                self.runner,
                &self.cfg.review,
                &self.cfg.branches.toolchain,
                root,
                gcc_dir,
                source_branch,
            )?;
            info!(patch = %id, internal = id.is_internal(), source = %gcc_dir.display(), "toolchain patch uploaded");
            patches.push(id);
        }

        let req = BuildRequest {
            target: target.clone(),
            branch: branch.clone(),
            patches: patches.clone(),
            chrome_version: opts.chrome_version.clone(),
            locality,
        };
        let key = submit(self.runner, &self.cfg.farm, root, &req)?;
        let mut report = RunReport { key, patches, outcome: None, artifacts: Vec::new(), sysroot: None };

        let dest = match (&req.locality, &opts.dest_dir) {
            (Locality::Remote, Some(dest)) => dest,
            _ => {
                info!(key = %report.key, "submitted; not waiting for artifacts");
                return Ok(report);
            }
        };

        let outcome = self.poll(&report.key)?;
        report.outcome = Some(outcome);
        let number = match outcome {
            PollOutcome::Found(n) => n,
            _ => {
                error!(key = %report.key, "remote trybot failed");
                bail!("remote trybot failed for {}", report.key);
            }
        };

        let version = opts.chromeos_version.clone().or_else(|| self.cfg.pinned_version(&branch).map(String::from));
        let install_root = opts.replace_sysroot.then_some(root);
        let staged = self.stage(&target, number, dest, version.as_deref(), install_root)?;
        report.artifacts = staged.artifacts;
        report.sysroot = staged.sysroot;
        Ok(report)
    }

    /// Waits for the build tagged with `key` to finish.
    pub fn poll(&self, key: &CorrelationKey) -> Result<PollOutcome> {
        let source = CommandStatusSource::new(self.runner, &self.cfg.farm.status_command);
        let policy = PollPolicy::from(&self.cfg.farm.poll);
        let poller = Poller::new(&source, self.clock, self.cancel.clone(), policy);
        info!(key = %key, "waiting for build");
        Ok(poller.wait(key)?)
    }

    /// Downloads and unpacks build `number` into `dest`, then installs it
    /// into `install_root` when given. Without a `version` the build's
    /// directory in the artifact store is looked up.
    pub fn stage(
        &self,
        target: &Target,
        number: u64,
        dest: &Path,
        version: Option<&str>,
        install_root: Option<&Path>,
    ) -> Result<Staged> {
        let store = ArtifactStore::new(self.runner, &self.cfg.artifacts);
        let version = match version {
            Some(v) => v.to_string(),
            None => store.discover_version(target, number)?,
        };
        info!(target = %target, number, version = %version, dest = %dest.display(), "fetching artifacts");
        let artifacts = fetch_artifacts(&store, target, number, dest, &version)?;
        unpack_artifacts(self.runner, dest)?;

        let sysroot = match install_root {
            Some(root) => Some(install_sysroot(self.runner, &self.cfg.install, root, target, dest)?),
            None => None,
        };
        Ok(Staged { version, artifacts, sysroot })
    }
}

/// Checks everything about an invocation that can be checked without
/// running a command.
pub fn validate(opts: &RunOptions) -> Result<(Target, Locality), ConfigError> {
    if let (Some(branch), Some(version)) = (&opts.branch, &opts.chromeos_version) {
        return Err(ConfigError::BranchAndVersion { branch: branch.clone(), version: version.clone() });
    }
    let target = Target::parse(&opts.target)?;
    if let Some(version) = &opts.chromeos_version {
        normalize_version(version).map_err(|_| ConfigError::InvalidVersion(version.clone()))?;
    }
    if !opts.chromeos_root.is_dir() {
        return Err(ConfigError::MissingPath { what: "chromeos root", path: opts.chromeos_root.clone() });
    }
    if let Some(gcc_dir) = &opts.gcc_dir {
        if !gcc_dir.is_dir() {
            return Err(ConfigError::MissingPath { what: "toolchain source", path: gcc_dir.clone() });
        }
    }
    let locality = if opts.local {
        Locality::Local { dest_dir: opts.dest_dir.clone().ok_or(ConfigError::LocalWithoutDest)? }
    } else {
        Locality::Remote
    };
    Ok((target, locality))
}
