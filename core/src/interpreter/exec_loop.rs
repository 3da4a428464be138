//! Core execution loop
//!
//! `step()` advances the evaluator by exactly one checkpoint: one token of
//! the program, or one element of a running quotation, however deeply
//! nested. Frame bookkeeping (finishing a call, starting the next loop
//! iteration, testing a cond pair) happens between checkpoints and is never
//! observable on its own.
//!
//! ## Function Organization
//! 1. run_until_done() - Top-level synchronous driver
//! 2. step() - One checkpoint
//! 3. advance() - Dispatch on the top frame
//! 4. unwind() / abort() - Control signals and failure cleanup

use std::rc::Rc;

use tracing::{debug, trace};

use super::binder;
use super::errors::{LocatedError, RuntimeError, BREAK_OUTSIDE_LOOP, TAILCALL_OUTSIDE_FUNCTION};
use super::stdlib::datadef;
use super::types::{CondPhase, Control, Frame, Signal, Value};
use super::vm::Evaluator;

/* ===================== Step Result ===================== */

/// Result of driving the evaluator one checkpoint
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// One token or quotation element was executed
    Checkpoint,
    /// An external operation is pending; see `Evaluator::resume`
    Suspended,
    /// Execution completed
    Done,
    /// Execution aborted with an error
    Failed(LocatedError),
}

enum Tick {
    Internal,
    Checkpoint,
}

/* ===================== Public API ===================== */

/// Step until the run completes, fails or suspends
pub fn run_until_done(ev: &mut Evaluator) -> Step {
    loop {
        match step(ev) {
            Step::Checkpoint => continue,
            other => return other,
        }
    }
}

/// Execute exactly one checkpoint
pub fn step(ev: &mut Evaluator) -> Step {
    loop {
        match ev.control {
            Control::None => {}
            Control::Suspend => return Step::Suspended,
            _ => {
                if let Some(settled) = unwind(ev) {
                    return settled;
                }
                continue;
            }
        }

        if ev.frames.is_empty() {
            return finish(ev);
        }

        match advance(ev) {
            Ok(Tick::Internal) => continue,
            Ok(Tick::Checkpoint) => return checkpoint(ev),
            Err(Signal::Error(error)) => {
                ev.control = Control::Throw(ev.locate(error));
                continue;
            }
            Err(signal) => {
                raise(ev, signal);
                return checkpoint(ev);
            }
        }
    }
}

/// Abandon the current run, releasing every activation it holds.
///
/// Scopes and floors owned by unwound calls and updaters are restored;
/// operands already on the stack stay where they are.
pub fn abort(ev: &mut Evaluator) {
    while let Some(frame) = ev.frames.pop() {
        ev.release(&frame);
    }
    ev.control = Control::None;
    ev.pending = None;
    ev.reset_collecting();
}

/* ===================== Dispatch ===================== */

fn checkpoint(ev: &mut Evaluator) -> Step {
    ev.checkpoints += 1;
    if ev.limits.trace_checkpoints {
        trace!(checkpoint = ev.checkpoints, origin = %ev.origin, "checkpoint");
    }
    Step::Checkpoint
}

fn advance(ev: &mut Evaluator) -> Result<Tick, Signal> {
    let idx = ev.frames.len() - 1;

    match &mut ev.frames[idx] {
        Frame::Program { tokens, pc } => {
            if *pc >= tokens.len() {
                ev.frames.pop();
                return Ok(Tick::Internal);
            }
            let token = tokens[*pc].clone();
            *pc += 1;
            ev.execute_token(&token)?;
            Ok(Tick::Checkpoint)
        }

        Frame::Body { code, pc } => {
            if *pc >= code.len() {
                ev.frames.pop();
                return Ok(Tick::Internal);
            }
            let value = code[*pc].clone();
            *pc += 1;
            ev.execute(value)?;
            Ok(Tick::Checkpoint)
        }

        Frame::Call { lam, floor } => {
            let (lam, floor) = (lam.clone(), *floor);
            if let Some(params) = &lam.params {
                binder::check_returns(ev, params, floor)?;
            }
            ev.frames.pop();
            ev.scopes.pop_scope();
            ev.stack.allow_pop(floor);
            Ok(Tick::Internal)
        }

        Frame::Loop { body } => {
            if body.is_empty() {
                // Each idle iteration is still a checkpoint so the loop
                // stays interruptible.
                return Ok(Tick::Checkpoint);
            }
            let body = body.clone();
            ev.push_frame(Frame::body(body))?;
            Ok(Tick::Internal)
        }

        Frame::For {
            source,
            index,
            with_index,
            body,
        } => {
            if *index >= source.len() {
                ev.frames.pop();
                return Ok(Tick::Internal);
            }
            let element = source.element(*index);
            let position = *index;
            let with_index = *with_index;
            let body = body.clone();
            *index += 1;

            ev.stack.push(element);
            if with_index {
                ev.stack.push(Value::Int(position as i64));
            }
            if body.is_empty() {
                return Ok(Tick::Checkpoint);
            }
            ev.push_frame(Frame::body(body))?;
            Ok(Tick::Internal)
        }

        Frame::Cond {
            pairs,
            index,
            phase,
        } => match phase {
            CondPhase::Test => {
                let Some((test, _)) = pairs.get(*index) else {
                    ev.frames.pop();
                    return Ok(Tick::Internal);
                };
                let test = test.clone();
                *phase = CondPhase::Check;
                ev.invoke(test)?;
                Ok(Tick::Internal)
            }
            CondPhase::Check => {
                let pairs = pairs.clone();
                let current = *index;
                match ev.stack.pop()? {
                    Value::Bool(true) => {
                        ev.frames.pop();
                        ev.invoke(pairs[current].1.clone())?;
                    }
                    Value::Bool(false) => {
                        if let Some(Frame::Cond { index, phase, .. }) = ev.frames.last_mut() {
                            *index += 1;
                            *phase = CondPhase::Test;
                        }
                    }
                    other => {
                        return Err(Signal::Error(RuntimeError::type_mismatch(format!(
                            "cond condition must produce Bool, got {} {}",
                            other.type_name(),
                            other
                        ))))
                    }
                }
                Ok(Tick::Internal)
            }
        },

        Frame::Try { .. } => {
            ev.frames.pop();
            Ok(Tick::Internal)
        }

        Frame::Update {
            instance,
            slot,
            scope,
            floor,
        } => {
            let (instance, slot, scope) = (instance.clone(), slot.clone(), scope.clone());
            let floor = *floor;
            ev.frames.pop();
            let produced = ev.stack.count().saturating_sub(floor);
            ev.stack.allow_pop(floor);
            if produced != 1 {
                return Err(Signal::Error(RuntimeError::arity(format!(
                    "update of `{}` field `{}` must leave exactly 1 value, left {}",
                    slot.ty, slot.field, produced
                ))));
            }
            let result = ev.stack.pop()?;
            datadef::write_back(ev, instance, &slot, &scope, result)?;
            Ok(Tick::Internal)
        }
    }
}

/* ===================== Control Flow ===================== */

fn raise(ev: &mut Evaluator, signal: Signal) {
    ev.control = match signal {
        Signal::Break => Control::Break,
        Signal::TailCall(target) => Control::TailCall(target),
        Signal::Await(pending) => {
            debug!(label = %pending.label, "suspending on external operation");
            ev.pending = Some(pending);
            Control::Suspend
        }
        Signal::Error(error) => Control::Throw(ev.locate(error)),
    };
}

/// Unwind the frame stack for the active control signal.
///
/// Returns `Some` when the run settles (or suspends) as a result.
fn unwind(ev: &mut Evaluator) -> Option<Step> {
    let control = std::mem::replace(&mut ev.control, Control::None);
    match control {
        Control::None => None,

        Control::Suspend => {
            ev.control = Control::Suspend;
            Some(Step::Suspended)
        }

        Control::Break => {
            while let Some(frame) = ev.frames.last() {
                match frame {
                    Frame::Loop { .. } | Frame::For { .. } => {
                        ev.frames.pop();
                        return None;
                    }
                    // A break never crosses a closure boundary
                    Frame::Call { .. } | Frame::Program { .. } => break,
                    _ => {
                        if let Some(frame) = ev.frames.pop() {
                            ev.release(&frame);
                        }
                    }
                }
            }
            Some(fail(ev, RuntimeError::control_flow(BREAK_OUTSIDE_LOOP)))
        }

        Control::TailCall(target) => {
            let Some(idx) = ev
                .frames
                .iter()
                .rposition(|f| matches!(f, Frame::Call { .. }))
            else {
                return Some(fail(ev, RuntimeError::control_flow(TAILCALL_OUTSIDE_FUNCTION)));
            };
            match ev.replace_activation(idx, target) {
                Ok(()) => None,
                Err(error) => Some(fail(ev, error)),
            }
        }

        Control::Throw(error) => Some(throw(ev, error)),
    }
}

fn fail(ev: &mut Evaluator, error: RuntimeError) -> Step {
    let located = ev.locate(error);
    throw(ev, located)
}

/// Hand an error to the innermost `try`, or fail the run
fn throw(ev: &mut Evaluator, error: LocatedError) -> Step {
    let Some(idx) = ev.frames.iter().rposition(|f| matches!(f, Frame::Try { .. })) else {
        return settle_failed(ev, error);
    };

    while ev.frames.len() > idx + 1 {
        if let Some(frame) = ev.frames.pop() {
            ev.release(&frame);
        }
    }
    if let Some(Frame::Try { height }) = ev.frames.pop() {
        ev.stack.truncate(height);
    }
    debug!(error = %error, "error caught");
    ev.stack.push(Value::Err(Rc::new(error)));
    checkpoint(ev)
}

fn settle_failed(ev: &mut Evaluator, error: LocatedError) -> Step {
    debug!(error = %error, "run failed");
    abort(ev);
    Step::Failed(error)
}

fn finish(ev: &mut Evaluator) -> Step {
    if ev.open_containers() > 0 {
        return fail(
            ev,
            RuntimeError::Unbalanced {
                message: "unclosed quotation or parameter list".to_string(),
            },
        );
    }
    Step::Done
}

/// Frame kinds from bottom to top
#[cfg(test)]
pub(crate) fn frame_kinds(ev: &Evaluator) -> Vec<&'static str> {
    ev.frames
        .iter()
        .map(|f| match f {
            Frame::Program { .. } => "program",
            Frame::Body { .. } => "body",
            Frame::Call { .. } => "call",
            Frame::Loop { .. } => "loop",
            Frame::For { .. } => "for",
            Frame::Cond { .. } => "cond",
            Frame::Try { .. } => "try",
            Frame::Update { .. } => "update",
        })
        .collect()
}
