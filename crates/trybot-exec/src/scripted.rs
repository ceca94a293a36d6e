use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

/// One recorded invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub line: String,
    pub cwd: Option<PathBuf>,
    pub auto_confirm: bool,
    pub echo: bool,
}

#[derive(Clone, Debug)]
pub enum Reply {
    Output(CommandOutput),
    /// The program could not be started.
    SpawnError(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Output(CommandOutput::default())
    }

    pub fn stdout(s: impl Into<String>) -> Self {
        Reply::Output(CommandOutput { status: 0, stdout: s.into(), stderr: String::new() })
    }

    pub fn stderr(s: impl Into<String>) -> Self {
        Reply::Output(CommandOutput { status: 0, stdout: String::new(), stderr: s.into() })
    }

    pub fn fail(status: i32) -> Self {
        Reply::Output(CommandOutput { status, stdout: String::new(), stderr: "scripted failure".into() })
    }
}

struct Rule {
    prefix: String,
    replies: Vec<Reply>,
    served: usize,
}

/// Test double for `CommandRunner`.
///
/// Replies are chosen by the longest registered prefix of the command line.
/// A rule with several replies serves them in order and then keeps repeating
/// the last one. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    log: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, prefix: impl Into<String>, reply: Reply) -> Self {
        self.on_seq(prefix, vec![reply])
    }

    pub fn on_seq(self, prefix: impl Into<String>, replies: Vec<Reply>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule { prefix: prefix.into(), replies, served: 0 });
        }
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.line).collect()
    }

    /// Lines that start with `prefix`, in invocation order.
    pub fn lines_starting_with(&self, prefix: &str) -> Vec<String> {
        self.lines().into_iter().filter(|l| l.starts_with(prefix)).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let line = spec.display();
        self.log
            .lock()
            .map_err(|_| anyhow!("scripted runner log poisoned"))?
            .push(Invocation {
                line: line.clone(),
                cwd: spec.cwd.clone(),
                auto_confirm: spec.auto_confirm,
                echo: spec.echo,
            });

        let mut rules = self.rules.lock().map_err(|_| anyhow!("scripted runner rules poisoned"))?;
        let rule = rules
            .iter_mut()
            .filter(|r| line.starts_with(r.prefix.as_str()))
            .max_by_key(|r| r.prefix.len());
        let reply = match rule {
            Some(rule) if !rule.replies.is_empty() => {
                let idx = rule.served.min(rule.replies.len() - 1);
                rule.served += 1;
                rule.replies[idx].clone()
            }
            _ => Reply::ok(),
        };
        match reply {
            Reply::Output(out) => Ok(out),
            Reply::SpawnError(msg) => Err(anyhow!("spawn {line}: {msg}")),
        }
    }
}
