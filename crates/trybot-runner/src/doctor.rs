use std::path::Path;

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::Config;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub what: String,
    pub ok: bool,
}

/// Programs a run may invoke, as configured.
pub fn required_tools(cfg: &Config) -> Vec<String> {
    let mut tools: Vec<String> = ["git", "rsync", "tar"].map(String::from).to_vec();
    for cmd in [&cfg.review.upload_command, &cfg.farm.status_command] {
        if let Some(program) = cmd.first() {
            tools.push(program.clone());
        }
    }
    tools.push(cfg.artifacts.store_command.clone());
    if cfg.install.use_sudo {
        tools.push("sudo".to_string());
    }
    tools.sort();
    tools.dedup();
    tools
}

pub fn tool_checks(cfg: &Config) -> Vec<Check> {
    required_tools(cfg)
        .into_iter()
        .map(|t| Check { ok: which::which(&t).is_ok(), what: format!("`{t}` on PATH") })
        .collect()
}

/// Directories of `chromeos_root` the run touches.
pub fn layout_checks(chromeos_root: &Path, cfg: &Config) -> Vec<Check> {
    let dirs = [
        chromeos_root.join(&cfg.farm.driver_dir),
        chromeos_root.join(&cfg.review.toolchain_dir),
        chromeos_root.join(&cfg.review.manifest_dir),
    ];
    dirs.iter().map(|d| Check { ok: d.is_dir(), what: d.display().to_string() }).collect()
}

/// Verifies the tools and, when given, the chromeos root layout.
pub fn doctor(chromeos_root: Option<&Path>, cfg: &Config) -> Result<()> {
    let mut checks = tool_checks(cfg);
    if let Some(root) = chromeos_root {
        checks.extend(layout_checks(root, cfg));
    }
    let mut failed = 0;
    for c in &checks {
        if c.ok {
            info!("[OK] {}", c.what);
        } else {
            error!("[FAIL] missing {}", c.what);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} doctor check(s) failed");
    }
    Ok(())
}
