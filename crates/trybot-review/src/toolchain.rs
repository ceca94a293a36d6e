use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use trybot_core::{release_number, ConfigError, PatchId};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::{checkout::ReviewCheckout, settings::ReviewSettings};

/// Maps a requested branch or version to the toolchain checkout's remote
/// branch name.
///
/// Tries, in order: a branch containing `requested`, a branch containing its
/// release number (`R25`), then the configured `known` table.
pub fn resolve_toolchain_branch(
    runner: &dyn CommandRunner,
    checkout: &Path,
    requested: &str,
    remote: &str,
    known: &BTreeMap<String, String>,
) -> Result<String> {
    let out = runner
        .run_checked(&CommandSpec::new("git").args(["branch", "-a"]).current_dir(checkout))
        .context("list toolchain branches")?;
    let branches: Vec<String> = out.stdout.lines().map(|l| normalize_branch(l, remote)).collect();
    let find = |needle: &str| branches.iter().find(|b| b.contains(needle)).cloned();

    if let Some(b) = find(requested) {
        return Ok(b);
    }
    if let Some(rel) = release_number(requested) {
        if let Some(b) = find(&rel) {
            return Ok(b);
        }
    }
    if let Some(b) = known.get(requested) {
        return Ok(b.clone());
    }
    Err(ConfigError::UnknownBranch(requested.to_string()).into())
}

/// `  remotes/cros/release-R25-3428.B` -> `release-R25-3428.B`
fn normalize_branch(line: &str, remote: &str) -> String {
    let b = line.trim().trim_start_matches("* ").trim();
    let prefix = format!("remotes/{remote}/");
    b.strip_prefix(prefix.as_str()).unwrap_or(b).to_string()
}

/// Uploads the local toolchain tree `source` as a patch against `branch` of
/// the chromeos root's toolchain checkout.
pub fn upload_toolchain_patch(
    runner: &dyn CommandRunner,
    settings: &ReviewSettings,
    known_branches: &BTreeMap<String, String>,
    chromeos_root: &Path,
    source: &Path,
    branch: &str,
) -> Result<PatchId> {
    if !source.is_dir() {
        return Err(ConfigError::MissingPath { what: "toolchain source", path: source.to_path_buf() }.into());
    }
    let checkout_dir = chromeos_root.join(&settings.toolchain_dir);
    let checkout = ReviewCheckout::open(runner, settings, &checkout_dir)?;
    checkout.remove_working_branch()?;

    let resolved =
        resolve_toolchain_branch(runner, &checkout_dir, branch, &settings.toolchain_remote, known_branches)?;
    info!(requested = branch, resolved = %resolved, "toolchain branch");
    checkout.start_working_branch(&format!("remotes/{}/{}", settings.toolchain_remote, resolved))?;
    checkout.clear_tree()?;
    checkout.sync_from(source)?;
    checkout.commit_and_upload(source)
}
