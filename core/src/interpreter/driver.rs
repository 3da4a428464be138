//! Host driving API
//!
//! A `Run` pulls checkpoints out of an evaluator one at a time and awaits
//! the external operations it suspends on. Cancellation is cooperative: the
//! token is checked before every checkpoint, and while an operation is
//! outstanding the run races it against the token, invoking the
//! operation's cancel action if the token wins.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::LocatedError;
use super::exec_loop::{self, Step};
use super::types::{Pending, Token, Value};
use super::vm::Evaluator;

const YIELD_EVERY: u32 = 256;

/// How a run settled
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Failed(LocatedError),
    Cancelled,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

/// Progress reported by one call to `Run::step`
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// One checkpoint executed
    Checkpoint,
    /// One pending external operation completed and the run resumed with
    /// its value or its error
    Resumed,
    /// The run is over; repeated calls keep returning the same outcome
    Settled(Outcome),
}

/// An in-progress run over a borrowed evaluator
pub struct Run<'a> {
    id: Uuid,
    ev: &'a mut Evaluator,
    cancel: CancellationToken,
    outcome: Option<Outcome>,
    /// Label of the operation whose cancel action ran
    interrupted: Option<String>,
}

impl Evaluator {
    /// Start a run over a token sequence
    pub fn start(&mut self, tokens: Vec<Token>) -> Run<'_> {
        self.load(tokens);
        Run::new(self)
    }

    /// Start a run executing a single value
    pub fn start_value(&mut self, value: Value) -> Run<'_> {
        self.load_value(value);
        Run::new(self)
    }

    /// Run a token sequence to completion
    pub async fn run(&mut self, tokens: Vec<Token>) -> Outcome {
        self.start(tokens).finish().await
    }
}

impl<'a> Run<'a> {
    fn new(ev: &'a mut Evaluator) -> Self {
        let id = Uuid::new_v4();
        debug!(run_id = %id, "run started");
        Self {
            id,
            ev,
            cancel: CancellationToken::new(),
            outcome: None,
            interrupted: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle that cancels this run when triggered
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Operation interrupted by cancellation, if its cancel action ran
    pub fn interrupted(&self) -> Option<&str> {
        self.interrupted.as_deref()
    }

    pub fn evaluator(&self) -> &Evaluator {
        &*self.ev
    }

    /// Advance one checkpoint, or await one pending external operation
    pub async fn step(&mut self) -> Progress {
        if let Some(outcome) = &self.outcome {
            return Progress::Settled(outcome.clone());
        }

        if self.cancel.is_cancelled() {
            return self.settle_cancelled();
        }

        if let Some(pending) = self.ev.take_pending() {
            return self.await_pending(pending).await;
        }

        match exec_loop::step(self.ev) {
            Step::Checkpoint => Progress::Checkpoint,
            Step::Suspended => match self.ev.take_pending() {
                Some(pending) => self.await_pending(pending).await,
                None => {
                    self.ev.resume(None);
                    Progress::Resumed
                }
            },
            Step::Done => self.settle(Outcome::Completed),
            Step::Failed(error) => self.settle(Outcome::Failed(error)),
        }
    }

    /// Drive the run until it settles.
    ///
    /// Yields to the runtime every `YIELD_EVERY` steps so a run that never
    /// suspends still lets its canceller make progress.
    pub async fn finish(mut self) -> Outcome {
        let mut steps: u32 = 0;
        loop {
            if let Progress::Settled(outcome) = self.step().await {
                return outcome;
            }
            steps = steps.wrapping_add(1);
            if steps % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }
    }

    async fn await_pending(&mut self, mut pending: Pending) -> Progress {
        let cancel = self.cancel.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = &mut pending.future => Some(result),
        };

        match result {
            None => {
                warn!(run_id = %self.id, label = %pending.label, "cancelled while awaiting");
                if let Some(cancel) = pending.cancel.take() {
                    cancel();
                    self.interrupted = Some(pending.label.clone());
                }
                self.settle_cancelled()
            }
            Some(Ok(value)) => {
                self.ev.resume(value);
                Progress::Resumed
            }
            Some(Err(error)) => {
                debug!(run_id = %self.id, label = %pending.label, "awaited operation failed");
                self.ev.fail_pending(error);
                Progress::Resumed
            }
        }
    }

    fn settle_cancelled(&mut self) -> Progress {
        exec_loop::abort(self.ev);
        self.settle(Outcome::Cancelled)
    }

    fn settle(&mut self, outcome: Outcome) -> Progress {
        debug!(run_id = %self.id, ?outcome, checkpoints = self.ev.checkpoints(), "run settled");
        self.outcome = Some(outcome.clone());
        Progress::Settled(outcome)
    }
}
