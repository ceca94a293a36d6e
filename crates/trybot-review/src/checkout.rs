use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use trybot_core::{ConfigError, PatchId};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::{
    lock::{CheckoutLock, LOCK_FILE},
    patch_id::parse_patch_id,
    settings::ReviewSettings,
};

/// Version-control metadata kept when the tree is cleared.
const KEEP_ENTRIES: &[&str] = &[".git", ".svn"];

/// Commit message fields for an uploaded patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitMessage {
    pub title: String,
    pub hostname: String,
    pub source: PathBuf,
}

impl CommitMessage {
    pub fn paragraphs(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            "BUG=None".to_string(),
            "TEST=None".to_string(),
            format!("hostname={}", self.hostname),
            format!("source={}", self.source.display()),
        ]
    }
}

/// A review-system checkout held under `CheckoutLock` while a patch is staged
/// on the working branch and uploaded.
pub struct ReviewCheckout<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a ReviewSettings,
    root: PathBuf,
    _lock: CheckoutLock,
}

impl<'a> ReviewCheckout<'a> {
    pub fn open(runner: &'a dyn CommandRunner, settings: &'a ReviewSettings, root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(ConfigError::MissingPath { what: "review checkout", path: root.to_path_buf() }.into());
        }
        let lock = CheckoutLock::acquire(root)?;
        Ok(Self { runner, settings, root: root.to_path_buf(), _lock: lock })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("git").args(args).current_dir(&self.root)
    }

    /// Deletes a leftover working branch from an earlier run. Failures are
    /// logged only; the branch usually does not exist.
    pub fn remove_working_branch(&self) -> Result<()> {
        let work = &self.settings.working_branch;
        let head = self.runner.run(&self.git(["rev-parse", "--abbrev-ref", "HEAD"]))?;
        if head.stdout.trim() == work {
            let scratch = &self.settings.scratch_branch;
            self.tolerate(self.git(["checkout", "-B", scratch.as_str()]))?;
            self.tolerate(self.git(["add", "-A", "."]))?;
            self.tolerate(self.git(["commit", "-m", "trybot: park abandoned tree"]))?;
        }
        self.tolerate(self.git(["branch", "-D", work.as_str()]))?;
        Ok(())
    }

    fn tolerate(&self, spec: CommandSpec) -> Result<()> {
        let out = self.runner.run(&spec)?;
        if !out.success() {
            debug!(cmd = %spec.display(), status = out.status, "ignored failure");
        }
        Ok(())
    }

    /// Creates the working branch tracking `upstream`.
    pub fn start_working_branch(&self, upstream: &str) -> Result<()> {
        let work = self.settings.working_branch.as_str();
        info!(checkout = %self.root.display(), branch = work, upstream, "start working branch");
        self.runner
            .run_checked(&self.git(["checkout", "-b", work, "-t", upstream]))
            .with_context(|| format!("create {work} tracking {upstream}"))?;
        Ok(())
    }

    /// Removes everything in the tree except version-control metadata and
    /// our own lock file.
    pub fn clear_tree(&self) -> Result<()> {
        let entries = std::fs::read_dir(&self.root).with_context(|| format!("read {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_str().is_some_and(|n| KEEP_ENTRIES.contains(&n) || n == LOCK_FILE) {
                continue;
            }
            let path = entry.path();
            let removed = if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(())
    }

    /// Copies `source` into the tree, skipping its version-control metadata.
    pub fn sync_from(&self, source: &Path) -> Result<()> {
        let spec = CommandSpec::new("rsync")
            .args(["-az", "--exclude=*.svn", "--exclude=*.git"])
            .arg(format!("{}/", source.display()))
            .arg(".")
            .current_dir(&self.root);
        self.runner.run_checked(&spec).with_context(|| format!("sync {}", source.display()))?;
        Ok(())
    }

    /// Replaces `rel` (often a symlink) with a copy of `from`.
    pub fn replace_file(&self, rel: &str, from: &Path) -> Result<()> {
        let dest = self.root.join(rel);
        if dest.symlink_metadata().is_ok() {
            std::fs::remove_file(&dest).with_context(|| format!("remove {}", dest.display()))?;
        }
        std::fs::copy(from, &dest).with_context(|| format!("copy {} to {}", from.display(), dest.display()))?;
        Ok(())
    }

    fn hostname(&self) -> String {
        match self.runner.run(&CommandSpec::new("hostname")) {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => out.stdout.trim().to_string(),
            _ => {
                warn!("could not determine hostname");
                "unknown-host".to_string()
            }
        }
    }

    /// Stages the whole tree, commits it, uploads it for review and returns
    /// the new patch id.
    pub fn commit_and_upload(&self, source: &Path) -> Result<PatchId> {
        let message = CommitMessage {
            title: self.settings.commit_title.clone(),
            hostname: self.hostname(),
            source: source.to_path_buf(),
        };
        self.runner.run_checked(&self.git(["add", "-A", "."])).context("stage tree")?;

        let mut commit = self.git(["commit"]);
        for p in message.paragraphs() {
            commit = commit.arg("-m").arg(p);
        }
        self.runner.run_checked(&commit).context("commit patch")?;

        let (program, args) = self
            .settings
            .upload_command
            .split_first()
            .context("review.upload_command is empty")?;
        let upload = CommandSpec::new(program.as_str())
            .args(args.iter().cloned())
            .current_dir(&self.root)
            .auto_confirm()
            .echo_output();
        let out = self.runner.run_checked(&upload).context("upload patch")?;

        let id = parse_patch_id(&out.stderr, &self.settings.review_marker, &self.settings.internal_marker)
            .context("parse upload output")?;
        info!(patch = %id, checkout = %self.root.display(), "uploaded patch");
        Ok(id)
    }
}
