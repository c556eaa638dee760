//! Ordered compensation for multi-step register writes.
//!
//! # Responsibility
//! - Remember how to undo every completed step of one operation.
//! - On failure, run the undo steps in reverse order and report the outcome.
//!
//! # Invariants
//! - Compensations run at most once, last registered first.
//! - The first failing compensation stops the unwind and yields a fatal
//!   `RegisterError::CompensationFailed` that wraps the original failure.

use crate::error::RegisterError;
use crate::repo::RepoResult;
use log::{debug, error, warn};

type Compensation<'a> = Box<dyn FnOnce() -> RepoResult<()> + 'a>;

/// Undo log for one operation.
pub(crate) struct Saga<'a> {
    operation: &'static str,
    steps: Vec<(&'static str, Compensation<'a>)>,
}

impl<'a> Saga<'a> {
    pub(crate) fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
        }
    }

    /// Registers the undo action for a step that just succeeded.
    pub(crate) fn record(
        &mut self,
        step: &'static str,
        undo: impl FnOnce() -> RepoResult<()> + 'a,
    ) {
        self.steps.push((step, Box::new(undo)));
    }

    /// Unwinds completed steps and returns the error to report.
    pub(crate) fn abort(self, failure: RegisterError) -> RegisterError {
        warn!(
            "event=saga_abort module=service status=start operation={} steps={} error_code={}",
            self.operation,
            self.steps.len(),
            failure.code()
        );

        for (step, undo) in self.steps.into_iter().rev() {
            if let Err(source) = undo() {
                error!(
                    "event=saga_compensate module=service status=fatal operation={} step={} error={}",
                    self.operation, step, source
                );
                return RegisterError::CompensationFailed {
                    operation: self.operation,
                    step,
                    original: Box::new(failure),
                    source,
                };
            }
            debug!(
                "event=saga_compensate module=service status=ok operation={} step={}",
                self.operation, step
            );
        }

        failure
    }

    /// Drops the undo log once every step has succeeded.
    pub(crate) fn complete(self) {
        debug!(
            "event=saga_complete module=service status=ok operation={} steps={}",
            self.operation,
            self.steps.len()
        );
    }
}
