use anyhow::Result;
use tracing::{error, info, warn};

type Action<'a> = Box<dyn FnMut() -> Result<()> + 'a>;

/// A named unit of work inside a `StepPlan`.
pub struct Step<'a> {
    name: String,
    action: Action<'a>,
    rollback: Option<Action<'a>>,
    retries: u32,
}

impl<'a> Step<'a> {
    pub fn new(name: impl Into<String>, action: impl FnMut() -> Result<()> + 'a) -> Self {
        Self { name: name.into(), action: Box::new(action), rollback: None, retries: 0 }
    }

    /// Undo hook, run if a later step fails.
    pub fn with_rollback(mut self, rollback: impl FnMut() -> Result<()> + 'a) -> Self {
        self.rollback = Some(Box::new(rollback));
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Ordered steps run one after another.
///
/// On the first failing step the rollbacks of every completed step run in
/// reverse order, then the plan's cleanup hook. Rollback errors are logged;
/// the step's own error is what gets returned.
pub struct StepPlan<'a> {
    label: String,
    steps: Vec<Step<'a>>,
    cleanup: Option<Action<'a>>,
}

impl<'a> StepPlan<'a> {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), steps: Vec::new(), cleanup: None }
    }

    pub fn step(mut self, step: Step<'a>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn on_failure(mut self, cleanup: impl FnMut() -> Result<()> + 'a) -> Self {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    pub fn run(self) -> Result<()> {
        let StepPlan { label, steps, cleanup } = self;
        let total = steps.len();
        let mut done: Vec<Step<'a>> = Vec::with_capacity(total);

        for (i, mut step) in steps.into_iter().enumerate() {
            info!(plan = %label, step = %step.name, "step {}/{}", i + 1, total);
            let mut attempt = 0;
            let result = loop {
                match (step.action)() {
                    Ok(()) => break Ok(()),
                    Err(e) if attempt < step.retries => {
                        attempt += 1;
                        warn!(plan = %label, step = %step.name, attempt, "retrying: {e:#}");
                    }
                    Err(e) => break Err(e),
                }
            };

            if let Err(e) = result {
                error!(plan = %label, step = %step.name, "step failed: {e:#}");
                unwind(&label, done, cleanup);
                return Err(e.context(format!("{label}: step {} failed", step.name)));
            }
            done.push(step);
        }
        Ok(())
    }
}

fn unwind<'a>(label: &str, done: Vec<Step<'a>>, cleanup: Option<Action<'a>>) {
    for step in done.into_iter().rev() {
        let Some(mut rollback) = step.rollback else {
            continue;
        };
        warn!(plan = %label, step = %step.name, "rolling back");
        if let Err(e) = rollback() {
            error!(plan = %label, step = %step.name, "rollback failed, manual recovery needed: {e:#}");
        }
    }
    if let Some(mut cleanup) = cleanup {
        if let Err(e) = cleanup() {
            error!(plan = %label, "cleanup failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::anyhow;

    use super::*;

    #[test]
    fn runs_all_steps_in_order() {
        let log = RefCell::new(Vec::new());
        StepPlan::new("t")
            .step(Step::new("a", || {
                log.borrow_mut().push("a");
                Ok(())
            }))
            .step(Step::new("b", || {
                log.borrow_mut().push("b");
                Ok(())
            }))
            .run()
            .unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn failure_unwinds_completed_steps_in_reverse_then_cleans_up() {
        let log = RefCell::new(Vec::new());
        let err = StepPlan::new("t")
            .step(
                Step::new("a", || Ok(())).with_rollback(|| {
                    log.borrow_mut().push("undo a");
                    Ok(())
                }),
            )
            .step(
                Step::new("b", || Ok(())).with_rollback(|| {
                    log.borrow_mut().push("undo b");
                    Err(anyhow!("stuck"))
                }),
            )
            .step(Step::new("c", || Err(anyhow!("boom"))).with_rollback(|| {
                log.borrow_mut().push("undo c");
                Ok(())
            }))
            .on_failure(|| {
                log.borrow_mut().push("cleanup");
                Ok(())
            })
            .run()
            .unwrap_err();
        assert_eq!(*log.borrow(), vec!["undo b", "undo a", "cleanup"]);
        assert!(format!("{err:#}").contains("step c failed"));
        assert!(format!("{err:#}").contains("boom"));
    }

    #[test]
    fn retries_before_failing() {
        let calls = RefCell::new(0);
        StepPlan::new("t")
            .step(
                Step::new("flaky", || {
                    *calls.borrow_mut() += 1;
                    if *calls.borrow() < 3 {
                        Err(anyhow!("try again"))
                    } else {
                        Ok(())
                    }
                })
                .with_retries(2),
            )
            .run()
            .unwrap();
        assert_eq!(*calls.borrow(), 3);
    }
}
