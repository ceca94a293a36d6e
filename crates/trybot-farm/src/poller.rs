use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};
use trybot_core::{Backoff, BuildRecord, CorrelationKey, PollOutcome};
use trybot_exec::{CommandRunner, CommandSpec};

use crate::{
    clock::{CancelToken, Clock},
    settings::PollSettings,
    status::{evaluate, parse_status_report},
};

/// Longest single sleep before the cancel token is checked again.
const CANCEL_CHECK: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("polling for {key} cancelled after {elapsed_secs}s")]
    Cancelled { key: String, elapsed_secs: u64 },
    #[error("no terminal build state for {key} within {elapsed_secs}s ({ticks} status queries)")]
    DeadlineExceeded { key: String, elapsed_secs: u64, ticks: u32 },
    #[error("status query failed: {0:#}")]
    Status(anyhow::Error),
}

/// Where status snapshots come from.
pub trait StatusSource {
    fn snapshot(&self) -> Result<Vec<BuildRecord>>;
}

/// Runs the configured status command and parses its report.
pub struct CommandStatusSource<'a> {
    runner: &'a dyn CommandRunner,
    command: &'a [String],
}

impl<'a> CommandStatusSource<'a> {
    pub fn new(runner: &'a dyn CommandRunner, command: &'a [String]) -> Self {
        Self { runner, command }
    }
}

impl StatusSource for CommandStatusSource<'_> {
    fn snapshot(&self) -> Result<Vec<BuildRecord>> {
        let Some((program, args)) = self.command.split_first() else {
            anyhow::bail!("farm.status_command is empty");
        };
        let spec = CommandSpec::new(program.as_str()).args(args.iter().cloned());
        let out = self.runner.run(&spec)?;
        if !out.success() {
            // Transient farm hiccups are common; whatever was printed still counts.
            warn!(status = out.status, stderr = %out.stderr.trim(), "status query exited nonzero");
        }
        Ok(parse_status_report(&out.stdout))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollPolicy {
    pub backoff: Backoff,
    pub deadline: Option<Duration>,
}

impl From<&PollSettings> for PollPolicy {
    fn from(s: &PollSettings) -> Self {
        Self { backoff: s.backoff.clone(), deadline: s.deadline_secs.map(Duration::from_secs) }
    }
}

/// Waits for a build with a given correlation key to reach a terminal state.
///
/// Each tick takes a fresh snapshot and evaluates it. `Pending` ticks sleep
/// for the policy's backoff and try again; there is no bound unless the
/// policy has a deadline or the cancel token fires.
pub struct Poller<'a> {
    source: &'a dyn StatusSource,
    clock: &'a dyn Clock,
    cancel: CancelToken,
    policy: PollPolicy,
}

impl<'a> Poller<'a> {
    pub fn new(source: &'a dyn StatusSource, clock: &'a dyn Clock, cancel: CancelToken, policy: PollPolicy) -> Self {
        Self { source, clock, cancel, policy }
    }

    /// One status query.
    pub fn tick(&self, key: &CorrelationKey) -> Result<PollOutcome, PollError> {
        let records = self.source.snapshot().map_err(PollError::Status)?;
        Ok(evaluate(key, &records))
    }

    /// Blocks until `key` resolves to `Found` or `FailedOnly`.
    pub fn wait(&self, key: &CorrelationKey) -> Result<PollOutcome, PollError> {
        let start = self.clock.now();
        let mut ticks: u32 = 0;
        loop {
            let elapsed = self.clock.now().duration_since(start);
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled { key: key.to_string(), elapsed_secs: elapsed.as_secs() });
            }

            ticks += 1;
            let outcome = self.tick(key)?;
            if outcome.is_terminal() {
                info!(key = %key, ticks, result = outcome.sentinel(), "build resolved");
                return Ok(outcome);
            }

            let mut delay = Duration::from_secs(self.policy.backoff.delay_seconds(ticks));
            if let Some(deadline) = self.policy.deadline {
                if elapsed >= deadline {
                    return Err(PollError::DeadlineExceeded {
                        key: key.to_string(),
                        elapsed_secs: elapsed.as_secs(),
                        ticks,
                    });
                }
                delay = delay.min(deadline - elapsed);
            }
            info!("{} minutes passed.", elapsed.as_secs() / 60);
            info!("Sleeping {} seconds.", delay.as_secs());
            self.sleep(delay);
        }
    }

    fn sleep(&self, total: Duration) {
        let mut left = total;
        while !left.is_zero() && !self.cancel.is_cancelled() {
            let step = left.min(CANCEL_CHECK);
            self.clock.sleep(step);
            left -= step;
        }
    }
}
