use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

pub(crate) const LOCK_FILE: &str = "trybot.lock";

/// Exclusive hold on a review checkout while its working branch is rewritten.
///
/// The lock is a file created with `create_new` in the checkout's git
/// directory, so it is never part of the tree that gets staged. A second holder fails fast instead of racing on branch state.
/// Dropping the guard removes the file.
#[derive(Debug)]
pub struct CheckoutLock {
    path: PathBuf,
    lease_id: String,
}

impl CheckoutLock {
    pub fn acquire(checkout: &Path) -> Result<Self> {
        let path = git_dir(checkout)?.join(LOCK_FILE);
        let lease_id = uuid::Uuid::new_v4().to_string();

        let mut f = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                return Err(anyhow!(
                    "checkout {} is locked by another invocation ({}); remove {} if it is stale",
                    checkout.display(),
                    holder.trim().replace('\n', ", "),
                    path.display()
                ));
            }
            Err(e) => return Err(e).with_context(|| format!("create lock {}", path.display())),
        };
        writeln!(f, "lease={}", lease_id)?;
        writeln!(f, "pid={}", std::process::id())?;
        debug!(lock = %path.display(), lease = %lease_id, "acquired checkout lock");
        Ok(Self { path, lease_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The checkout's repository metadata directory. `.git` is a plain file
/// holding `gitdir: <path>` in worktrees, submodules and separate-git-dir
/// clones. Without any `.git` the checkout root itself is used.
fn git_dir(checkout: &Path) -> Result<PathBuf> {
    let dot_git = checkout.join(".git");
    if dot_git.is_dir() {
        return Ok(dot_git);
    }
    if !dot_git.is_file() {
        return Ok(checkout.to_path_buf());
    }
    let content = std::fs::read_to_string(&dot_git).with_context(|| format!("read {}", dot_git.display()))?;
    let target = content
        .lines()
        .find_map(|l| l.strip_prefix("gitdir:"))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("{} has no gitdir line", dot_git.display()))?;
    let dir = checkout.join(target);
    if !dir.is_dir() {
        bail!("git dir {} named by {} does not exist", dir.display(), dot_git.display());
    }
    Ok(dir)
}

impl Drop for CheckoutLock {
    fn drop(&mut self) {
        let ours = std::fs::read_to_string(&self.path)
            .map(|s| s.lines().any(|l| l == format!("lease={}", self.lease_id)))
            .unwrap_or(false);
        if !ours {
            warn!(lock = %self.path.display(), "checkout lock was replaced; leaving it");
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), "release checkout lock: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_until_release() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let first = CheckoutLock::acquire(dir.path()).unwrap();
        assert!(first.path().starts_with(dir.path().join(".git")));
        let err = CheckoutLock::acquire(dir.path()).unwrap_err();
        assert!(err.to_string().contains("locked"));

        drop(first);
        let again = CheckoutLock::acquire(dir.path()).unwrap();
        assert!(again.path().exists());
    }

    #[test]
    fn gitfile_checkout_locks_in_real_git_dir() {
        let root = tempdir().unwrap();
        let checkout = root.path().join("gcc");
        let real = root.path().join("gcc.git");
        std::fs::create_dir_all(&checkout).unwrap();
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(checkout.join(".git"), "gitdir: ../gcc.git\n").unwrap();

        let lock = CheckoutLock::acquire(&checkout).unwrap();
        assert!(lock.path().starts_with(&real));
        assert!(!checkout.join(LOCK_FILE).exists());

        std::fs::write(checkout.join(".git"), format!("gitdir: {}\n", real.display())).unwrap();
        assert!(CheckoutLock::acquire(&checkout).unwrap_err().to_string().contains("locked"));
    }

    #[test]
    fn dangling_gitfile_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: /nonexistent/trybot/repo.git\n").unwrap();
        assert!(CheckoutLock::acquire(dir.path()).is_err());
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn lock_file_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = {
            let lock = CheckoutLock::acquire(dir.path()).unwrap();
            lock.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
