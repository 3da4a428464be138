//! Errors and timed waits

use std::time::Duration;

use tracing::debug;

use super::{mismatch, pop_int, pop_str};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::types::{OpResult, Pending, Signal, Value};
use crate::interpreter::vm::Evaluator;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[
    ("error", error),
    ("err?", is_err),
    ("err-msg", err_msg),
    ("sleep", sleep),
];

/// `"message" error`
pub fn error(ev: &mut Evaluator) -> OpResult {
    let message = pop_str(ev, "error")?;
    Err(RuntimeError::UserRaised {
        message: message.to_string(),
    }
    .into())
}

pub fn is_err(ev: &mut Evaluator) -> OpResult {
    let value = ev.stack.pop()?;
    ev.stack.push(Value::Bool(matches!(value, Value::Err(_))));
    Ok(())
}

/// Message of an error value caught by `try`
pub fn err_msg(ev: &mut Evaluator) -> OpResult {
    match ev.stack.pop()? {
        Value::Err(err) => {
            ev.stack.push(Value::str(&err.message()));
            Ok(())
        }
        other => Err(mismatch("err-msg", "Err", &other).into()),
    }
}

/// `ms sleep`: suspends the run on a timer
pub fn sleep(ev: &mut Evaluator) -> OpResult {
    let ms = pop_int(ev, "sleep")?;
    let ms = u64::try_from(ms)
        .map_err(|_| mismatch("sleep", "a non-negative Int", &Value::Int(ms)))?;

    let pending = Pending::new("sleep", async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(None)
    })
    .on_cancel(move || debug!(ms, "sleep cancelled"));
    Err(Signal::Await(pending))
}
