/// Result of evaluating one build-farm status snapshot for a correlation key.
///
/// `Found` and `FailedOnly` are terminal. `Pending` means either nothing has
/// completed yet or a failed build still has a same-key retry in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Found(u64),
    FailedOnly,
    Pending,
}

impl PollOutcome {
    /// Legacy integer encoding: build number, `0` for failed, `-1` for pending.
    pub fn sentinel(&self) -> i64 {
        match self {
            PollOutcome::Found(n) => *n as i64,
            PollOutcome::FailedOnly => 0,
            PollOutcome::Pending => -1,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::Pending)
    }
}
