use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use trybot_core::{version_number, ConfigError, PatchId};
use trybot_exec::{CommandRunner, CommandSpec};
use walkdir::WalkDir;

use crate::{checkout::ReviewCheckout, settings::ReviewSettings};

const MANIFEST_FILE: &str = "default.xml";

/// First file (in sorted walk order) under `repo` whose name contains the
/// numeric part of `version`.
pub fn find_manifest(repo: &Path, version: &str) -> Result<PathBuf> {
    let number = version_number(version).map_err(|_| ConfigError::InvalidVersion(version.to_string()))?;
    WalkDir::new(repo)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| e.file_name().to_string_lossy().contains(number))
        .map(|e| e.into_path())
        .ok_or_else(|| ConfigError::ManifestNotFound(version.to_string()).into())
}

/// Clones the manifest history repository and copies the manifest for
/// `version` to `to`.
pub fn fetch_manifest(runner: &dyn CommandRunner, repo_url: &str, version: &str, to: &Path) -> Result<()> {
    let scratch = tempfile::tempdir().context("create manifest scratch dir")?;
    let clone_dir = scratch.path().join("manifest-versions");
    runner
        .run_checked(
            &CommandSpec::new("git")
                .args(["clone", "--depth", "1", repo_url])
                .path_arg(&clone_dir)
                .current_dir(scratch.path()),
        )
        .with_context(|| format!("clone {repo_url}"))?;

    let found = find_manifest(&clone_dir, version)?;
    info!(version, manifest = %found.display(), "found manifest");
    std::fs::copy(&found, to).with_context(|| format!("cannot copy manifest to {}", to.display()))?;
    Ok(())
}

/// Puts `manifest` in place of the manifest checkout's `default.xml` on a
/// working branch tracking `branch` and uploads it.
pub fn upload_manifest(
    runner: &dyn CommandRunner,
    settings: &ReviewSettings,
    chromeos_root: &Path,
    manifest: &Path,
    branch: &str,
) -> Result<PatchId> {
    let checkout_dir = chromeos_root.join(&settings.manifest_dir);
    let checkout = ReviewCheckout::open(runner, settings, &checkout_dir)?;
    checkout.remove_working_branch()?;
    checkout.start_working_branch(&format!("{}/{}", settings.manifest_remote, branch))?;
    // default.xml links to full.xml, which can move while the build runs.
    checkout.replace_file(MANIFEST_FILE, manifest)?;
    checkout.commit_and_upload(manifest)
}

/// Fetches the manifest pinned to `version` and uploads it as a patch.
pub fn manifest_patch(
    runner: &dyn CommandRunner,
    settings: &ReviewSettings,
    chromeos_root: &Path,
    version: &str,
    branch: &str,
) -> Result<PatchId> {
    let scratch = tempfile::tempdir().context("create manifest dir")?;
    let manifest = scratch.path().join(MANIFEST_FILE);
    fetch_manifest(runner, &settings.manifest_repo_url, version, &manifest)?;
    upload_manifest(runner, settings, chromeos_root, &manifest, branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trybot_exec::{Reply, ScriptedRunner};

    fn manifest_repo() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let b = dir.path().join("buildspecs").join("25");
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(b.join("3428.65.1.xml"), "<manifest/>").unwrap();
        std::fs::write(b.join("3428.66.0.xml"), "<other/>").unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("3428.65.1.pack"), "x").unwrap();
        dir
    }

    #[test]
    fn finds_by_version_number() {
        let repo = manifest_repo();
        let found = find_manifest(repo.path(), "R25-3428.65.1").unwrap();
        assert!(found.ends_with("buildspecs/25/3428.65.1.xml"));
    }

    #[test]
    fn missing_version_is_config_error() {
        let repo = manifest_repo();
        let err = find_manifest(repo.path(), "R26-9999.0.0").unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::ManifestNotFound(_))));
        let err = find_manifest(repo.path(), "3428").unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::InvalidVersion(_))));
    }

    #[test]
    fn upload_replaces_default_xml() {
        let root = tempdir().unwrap();
        let checkout = root.path().join("manifest-internal");
        std::fs::create_dir_all(checkout.join(".git")).unwrap();
        std::fs::write(checkout.join("default.xml"), "<stale/>").unwrap();
        let pinned = root.path().join("pinned.xml");
        std::fs::write(&pinned, "<pinned/>").unwrap();

        let runner =
            ScriptedRunner::new().on("repo upload", Reply::stderr("remote: gerrit-int.example/c/ 31337 new\n"));
        let settings = ReviewSettings::default();
        let id = upload_manifest(&runner, &settings, root.path(), &pinned, "master").unwrap();

        assert_eq!(id.as_str(), "*31337");
        assert_eq!(std::fs::read_to_string(checkout.join("default.xml")).unwrap(), "<pinned/>");
        assert!(runner.lines().contains(&"git checkout -b trybot-work -t cros-internal/master".to_string()));
    }
}
