use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

/// A single external program invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Answer interactive prompts with a stream of `y` lines.
    pub auto_confirm: bool,
    /// Log each output line at info level as it arrives instead of debug.
    pub echo: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: None, auto_confirm: false, echo: false }
    }

    /// `sudo <program>` when `elevated` is set, `<program>` otherwise.
    pub fn privileged(elevated: bool, program: impl Into<String>) -> Self {
        if elevated {
            Self::new("sudo").arg(program.into())
        } else {
            Self::new(program)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn auto_confirm(mut self) -> Self {
        self.auto_confirm = true;
        self
    }

    /// For long-running commands whose progress the user should see live.
    pub fn echo_output(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Space-joined command line, used for logging and by `ScriptedRunner`.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for a in &self.args {
            line.push(' ');
            line.push_str(a);
        }
        line
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion. Errors only when the program could not
    /// be started; a nonzero exit is reported through `CommandOutput::status`.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Like `run`, but a nonzero exit becomes an error carrying both streams.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let out = self.run(spec)?;
        if !out.success() {
            return Err(anyhow!(
                "command failed ({}): {}\nstdout:{}\nstderr:{}",
                out.status,
                spec.display(),
                out.stdout,
                out.stderr
            ));
        }
        Ok(out)
    }
}
