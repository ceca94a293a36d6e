use std::cell::RefCell;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::warn;
use trybot_core::{AUTOTEST_ARCHIVE, DEBUG_SYMBOLS, PACKAGE_EXTENSION, SYSROOT_ARCHIVE, TEST_IMAGE_ARCHIVE};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::steps::{Step, StepPlan};

/// The single `*.tbz2` package archive in `dest`.
pub fn find_package_archive(dest: &Path) -> Result<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dest).with_context(|| format!("read {}", dest.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == OsStr::new(PACKAGE_EXTENSION)) {
            found.push(path);
        }
    }
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => bail!("no *.{PACKAGE_EXTENSION} package in {}", dest.display()),
        n => bail!("{n} *.{PACKAGE_EXTENSION} packages in {}, expected one", dest.display()),
    }
}

fn tar(flags: &str, archive: &Path, into: &Path) -> CommandSpec {
    CommandSpec::new("tar").arg(flags).path_arg(archive).arg("-C").path_arg(into)
}

fn extract(runner: &dyn CommandRunner, flags: &str, archive: &Path, into: &Path) -> Result<()> {
    std::fs::create_dir_all(into).with_context(|| format!("create {}", into.display()))?;
    runner.run_checked(&tar(flags, archive, into))?;
    Ok(())
}

/// Lays the fetched artifacts in `dest` out as a sysroot tree.
///
/// Any failure, including a missing package archive, deletes `dest`; the
/// fetch has to be redone.
pub fn unpack_artifacts(runner: &dyn CommandRunner, dest: &Path) -> Result<()> {
    let package: RefCell<Option<PathBuf>> = RefCell::new(None);
    let usr_lib = dest.join("usr").join("lib");
    let usr_local = dest.join("usr").join("local");

    StepPlan::new("unpack")
        .step(Step::new("locate-package", || {
            *package.borrow_mut() = Some(find_package_archive(dest)?);
            Ok(())
        }))
        .step(Step::new("extract-sysroot", || extract(runner, "xJf", &dest.join(SYSROOT_ARCHIVE), dest)))
        .step(Step::new("extract-chrome-package", || {
            let pkg = package.borrow().clone().context("package archive not located")?;
            extract(runner, "xjf", &pkg, dest)
        }))
        .step(Step::new("extract-debug-symbols", || extract(runner, "xzf", &dest.join(DEBUG_SYMBOLS), &usr_lib)))
        .step(Step::new("extract-autotest", || extract(runner, "xf", &dest.join(AUTOTEST_ARCHIVE), &usr_local)))
        .step(Step::new("extract-test-image", || extract(runner, "xJf", &dest.join(TEST_IMAGE_ARCHIVE), dest)))
        .on_failure(|| {
            warn!(dest = %dest.display(), "discarding partially unpacked tree");
            std::fs::remove_dir_all(dest).with_context(|| format!("remove {}", dest.display()))
        })
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trybot_exec::{Reply, ScriptedRunner};

    fn fetched() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("chromeos-chrome-25.0.1364.0_rc-r1.tbz2"), "").unwrap();
        std::fs::write(dir.path().join(SYSROOT_ARCHIVE), "").unwrap();
        dir
    }

    #[test]
    fn extracts_in_order() {
        let dir = fetched();
        let d = dir.path().display().to_string();
        let runner = ScriptedRunner::new();
        unpack_artifacts(&runner, dir.path()).unwrap();
        assert_eq!(
            runner.lines(),
            vec![
                format!("tar xJf {d}/{SYSROOT_ARCHIVE} -C {d}"),
                format!("tar xjf {d}/chromeos-chrome-25.0.1364.0_rc-r1.tbz2 -C {d}"),
                format!("tar xzf {d}/debug.tgz -C {d}/usr/lib"),
                format!("tar xf {d}/autotest.tar -C {d}/usr/local"),
                format!("tar xJf {d}/chromiumos_test_image.tar.xz -C {d}"),
            ]
        );
    }

    #[test]
    fn failure_discards_destination() {
        let dir = fetched();
        let dest = dir.path().join("work");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("pkg.tbz2"), "").unwrap();
        let runner = ScriptedRunner::new().on("tar xzf", Reply::fail(2));
        let err = unpack_artifacts(&runner, &dest).unwrap_err();
        assert!(format!("{err:#}").contains("extract-debug-symbols"));
        assert!(!dest.exists());
        assert_eq!(runner.lines().len(), 3);
    }

    #[test]
    fn missing_package_discards_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join(SYSROOT_ARCHIVE), "").unwrap();
        let runner = ScriptedRunner::new();
        let err = unpack_artifacts(&runner, &dest).unwrap_err();
        assert!(format!("{err:#}").contains("locate-package"));
        assert!(!dest.exists());
        assert!(runner.lines().is_empty());
    }

    #[test]
    fn package_must_be_unique() {
        let dir = fetched();
        std::fs::write(dir.path().join("second.tbz2"), "").unwrap();
        assert!(find_package_archive(dir.path()).is_err());
        let empty = tempdir().unwrap();
        assert!(find_package_archive(empty.path()).is_err());
    }
}
