use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use trybot_core::{BuildRequest, CorrelationKey, Locality};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::settings::FarmSettings;

/// Driver invocation for `req`, tagged with `key` as its remote description.
pub fn submit_command(
    settings: &FarmSettings,
    chromeos_root: &Path,
    req: &BuildRequest,
    key: &CorrelationKey,
) -> CommandSpec {
    let mut cmd = CommandSpec::new(settings.driver.as_str()).current_dir(chromeos_root.join(&settings.driver_dir));
    for p in &req.patches {
        cmd = cmd.arg("-g").arg(p.as_str());
    }
    if req.branch != settings.default_branch {
        cmd = cmd.arg("-b").arg(req.branch.as_str());
    }
    if let Some(v) = &req.chrome_version {
        cmd = cmd.arg(format!("--chrome_version={v}"));
    }
    cmd = match &req.locality {
        Locality::Remote => cmd.arg("--remote"),
        Locality::Local { dest_dir } => cmd.arg("--local").arg("-r").path_arg(dest_dir),
    };
    cmd.arg(req.target.as_str())
        .arg(format!("--remote-description={key}"))
        .auto_confirm()
        .echo_output()
}

/// Hands `req` to the build farm and returns the key to poll for.
///
/// The driver's exit status is only logged: completion is observed through
/// the status report, never through this call.
pub fn submit(runner: &dyn CommandRunner, settings: &FarmSettings, chromeos_root: &Path, req: &BuildRequest) -> Result<CorrelationKey> {
    let key = req.correlation_key();
    let cmd = submit_command(settings, chromeos_root, req, &key);
    info!(key = %key, cmd = %cmd.display(), "submitting build");
    let out = runner.run(&cmd).context("launch build-farm driver")?;
    if !out.success() {
        warn!(status = out.status, key = %key, "build-farm driver exited nonzero");
    }
    Ok(key)
}
