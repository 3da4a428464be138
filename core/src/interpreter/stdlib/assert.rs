//! Assertion operators
//!
//! Each pops two operands and reports the outcome to the evaluator's test
//! reporter. An assertion never fails the run by itself.

use tracing::warn;

use super::mismatch;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::reporter::AssertionKind;
use crate::interpreter::types::{OpResult, Value};
use crate::interpreter::vm::Evaluator;

/// Relative tolerance of the approximate comparisons
pub const APPROX_EPSILON: f64 = 1e-9;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[
    ("assert-eq", assert_eq),
    ("assert-ne", assert_ne),
    ("assert-approx", assert_approx),
    ("assert-not-approx", assert_not_approx),
];

fn report(ev: &Evaluator, passed: bool, kind: AssertionKind, operands: [Value; 2]) {
    match ev.reporter() {
        Some(reporter) => reporter
            .borrow_mut()
            .report(passed, kind, &operands, ev.origin),
        None if !passed => {
            warn!(
                %kind,
                origin = %ev.origin,
                left = %operands[0],
                right = %operands[1],
                "assertion failed"
            );
        }
        None => {}
    }
}

fn pop_operands(ev: &mut Evaluator) -> Result<[Value; 2], RuntimeError> {
    let right = ev.stack.pop()?;
    let left = ev.stack.pop()?;
    Ok([left, right])
}

fn as_f64(op: &str, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Flt(n) => Ok(*n),
        other => Err(mismatch(op, "Num", other)),
    }
}

fn approx(op: &str, operands: &[Value; 2]) -> Result<bool, RuntimeError> {
    let a = as_f64(op, &operands[0])?;
    let b = as_f64(op, &operands[1])?;
    let scale = a.abs().max(b.abs()).max(1.0);
    Ok((a - b).abs() <= APPROX_EPSILON * scale)
}

pub fn assert_eq(ev: &mut Evaluator) -> OpResult {
    let operands = pop_operands(ev)?;
    let passed = operands[0] == operands[1];
    report(ev, passed, AssertionKind::Equals, operands);
    Ok(())
}

pub fn assert_ne(ev: &mut Evaluator) -> OpResult {
    let operands = pop_operands(ev)?;
    let passed = operands[0] != operands[1];
    report(ev, passed, AssertionKind::NotEquals, operands);
    Ok(())
}

pub fn assert_approx(ev: &mut Evaluator) -> OpResult {
    let operands = pop_operands(ev)?;
    let passed = approx("assert-approx", &operands)?;
    report(ev, passed, AssertionKind::ApproxEquals, operands);
    Ok(())
}

pub fn assert_not_approx(ev: &mut Evaluator) -> OpResult {
    let operands = pop_operands(ev)?;
    let passed = !approx("assert-not-approx", &operands)?;
    report(ev, passed, AssertionKind::NotApproxEquals, operands);
    Ok(())
}
