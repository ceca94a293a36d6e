use std::cell::Cell;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use trybot_core::{Target, TEST_IMAGE_BIN};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::{
    settings::InstallSettings,
    steps::{Step, StepPlan},
};

/// Where a board's sysroot and latest image live inside a chromeos root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SysrootLayout {
    pub board_dir: PathBuf,
    /// The previous sysroot is parked here until the new one is in place.
    pub backup_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl SysrootLayout {
    pub fn new(chromeos_root: &Path, board: &str) -> Self {
        let board_dir = chromeos_root.join("chroot").join("build").join(board);
        let backup_dir = chromeos_root.join("chroot").join("build").join(format!("{board}.trybot-previous"));
        let image_dir = chromeos_root.join("src").join("build").join("images").join(board).join("latest");
        Self { board_dir, backup_dir, image_dir }
    }
}

fn exists(p: &Path) -> bool {
    p.symlink_metadata().is_ok()
}

/// Replaces the board sysroot with `unpacked` and stages its test image.
///
/// The old sysroot is moved aside rather than deleted, so a failure at any
/// step puts it back. It is removed only once everything succeeded.
pub fn install_sysroot(
    runner: &dyn CommandRunner,
    settings: &InstallSettings,
    chromeos_root: &Path,
    target: &Target,
    unpacked: &Path,
) -> Result<SysrootLayout> {
    let layout = SysrootLayout::new(chromeos_root, target.board());
    let sudo = settings.use_sudo;
    let retired = Cell::new(false);
    let (board, backup, image) = (&layout.board_dir, &layout.backup_dir, &layout.image_dir);

    let mv = |from: &Path, to: &Path| -> Result<()> {
        runner.run_checked(&CommandSpec::privileged(sudo, "mv").path_arg(from).path_arg(to))?;
        Ok(())
    };
    let rm_rf = |p: &Path| -> Result<()> {
        runner.run_checked(&CommandSpec::privileged(sudo, "rm").arg("-rf").path_arg(p))?;
        Ok(())
    };

    info!(board = target.board(), sysroot = %board.display(), "installing sysroot");
    StepPlan::new("install")
        .step(
            Step::new("retire-sysroot", || {
                if exists(backup) {
                    rm_rf(backup)?;
                }
                if exists(board) {
                    mv(board, backup)?;
                    retired.set(true);
                }
                Ok(())
            })
            .with_rollback(|| if retired.get() { mv(backup, board) } else { Ok(()) }),
        )
        .step(Step::new("install-sysroot", || mv(unpacked, board)).with_rollback(|| mv(board, unpacked)))
        .step(Step::new("reset-image-dir", || {
            if exists(image) {
                std::fs::remove_dir_all(image).with_context(|| format!("remove {}", image.display()))?;
            }
            std::fs::create_dir_all(image).with_context(|| format!("create {}", image.display()))
        }))
        .step(Step::new("stage-test-image", || {
            runner.run_checked(&CommandSpec::new("mv").path_arg(&board.join(TEST_IMAGE_BIN)).path_arg(image))?;
            Ok(())
        }))
        .run()?;

    if retired.get() {
        if let Err(e) = rm_rf(backup) {
            warn!(backup = %backup.display(), "previous sysroot left behind: {e:#}");
        }
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trybot_exec::{Reply, ScriptedRunner};

    #[test]
    fn layout_from_board() {
        let l = SysrootLayout::new(Path::new("/cros"), "lumpy");
        assert_eq!(l.board_dir, Path::new("/cros/chroot/build/lumpy"));
        assert_eq!(l.image_dir, Path::new("/cros/src/build/images/lumpy/latest"));
    }

    #[test]
    fn replaces_existing_sysroot() {
        let root = tempdir().unwrap();
        let layout = SysrootLayout::new(root.path(), "lumpy");
        std::fs::create_dir_all(&layout.board_dir).unwrap();
        std::fs::create_dir_all(&layout.image_dir).unwrap();
        std::fs::write(layout.image_dir.join("old.bin"), "").unwrap();
        let unpacked = root.path().join("out");

        let runner = ScriptedRunner::new();
        let target = Target::parse("lumpy-release").unwrap();
        install_sysroot(&runner, &InstallSettings::default(), root.path(), &target, &unpacked).unwrap();

        let (b, k, i) = (layout.board_dir.display(), layout.backup_dir.display(), layout.image_dir.display());
        assert_eq!(
            runner.lines(),
            vec![
                format!("sudo mv {b} {k}"),
                format!("sudo mv {} {b}", unpacked.display()),
                format!("mv {b}/{TEST_IMAGE_BIN} {i}"),
                format!("sudo rm -rf {k}"),
            ]
        );
        assert!(layout.image_dir.is_dir());
        assert!(!layout.image_dir.join("old.bin").exists());
    }

    #[test]
    fn failed_image_move_restores_previous_sysroot() {
        let root = tempdir().unwrap();
        let layout = SysrootLayout::new(root.path(), "lumpy");
        std::fs::create_dir_all(&layout.board_dir).unwrap();
        let unpacked = root.path().join("out");

        let runner = ScriptedRunner::new().on("mv", Reply::fail(1));
        let target = Target::parse("lumpy-release").unwrap();
        let settings = InstallSettings { use_sudo: true };
        assert!(install_sysroot(&runner, &settings, root.path(), &target, &unpacked).is_err());

        let (b, k) = (layout.board_dir.display(), layout.backup_dir.display());
        let tail: Vec<String> = runner.lines().into_iter().skip(3).collect();
        assert_eq!(tail, vec![format!("sudo mv {b} {}", unpacked.display()), format!("sudo mv {k} {b}")]);
    }

    #[test]
    fn no_sudo_and_no_previous_sysroot() {
        let root = tempdir().unwrap();
        let unpacked = root.path().join("out");
        let runner = ScriptedRunner::new();
        let target = Target::parse("daisy-release").unwrap();
        install_sysroot(&runner, &InstallSettings { use_sudo: false }, root.path(), &target, &unpacked).unwrap();
        assert!(runner.lines().iter().all(|l| !l.starts_with("sudo")));
        assert_eq!(runner.lines().len(), 2);
    }
}
