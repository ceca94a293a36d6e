use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// Number of `y` answers fed to commands that ask for confirmation.
const CONFIRM_LINES: usize = 256;

/// Runs commands as child processes and captures both output streams.
///
/// Output is read line by line while the child runs, so a long build shows
/// progress in the log instead of a single dump at exit.
#[derive(Clone, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(cmd = %spec.display(), cwd = ?spec.cwd, "run");
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(if spec.auto_confirm { Stdio::piped() } else { Stdio::null() });

        let mut child = cmd.spawn().with_context(|| format!("spawn {}", spec.display()))?;
        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit before reading every answer; a broken pipe is fine.
            let answers = "y\n".repeat(CONFIRM_LINES);
            let _ = stdin.write_all(answers.as_bytes());
        }
        let stdout = child.stdout.take().context("stdout was not piped")?;
        let stderr = child.stderr.take().context("stderr was not piped")?;

        let (stdout, stderr) = std::thread::scope(|s| {
            let err = s.spawn(|| pump(stderr, spec, "stderr"));
            let out = pump(stdout, spec, "stdout");
            (out, err.join())
        });
        let status = child.wait().with_context(|| format!("wait {}", spec.display()))?;

        let output = CommandOutput {
            status: status.code().unwrap_or(-1),
            stdout: stdout.with_context(|| format!("read stdout of {}", spec.display()))?,
            stderr: stderr
                .map_err(|_| anyhow!("stderr reader of {} panicked", spec.display()))?
                .with_context(|| format!("read stderr of {}", spec.display()))?,
        };
        debug!(cmd = %spec.display(), status = output.status, "exit");
        Ok(output)
    }
}

/// Reads `stream` to the end, logging each line and returning all of it.
fn pump(stream: impl Read, spec: &CommandSpec, name: &'static str) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\n', '\r']);
        if spec.echo {
            info!(program = %spec.program, stream = name, "{text}");
        } else {
            debug!(program = %spec.program, stream = name, "{text}");
        }
        captured.extend_from_slice(&line);
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}
