//! Arithmetic, comparison and logic
//!
//! `Int op Int` stays an `Int` (checked); any `Flt` operand promotes.

use std::cmp::Ordering;

use super::{mismatch, pop_bool};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::types::{OpResult, Value};
use crate::interpreter::vm::Evaluator;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("%", rem),
    ("neg", neg),
    ("=", eq),
    ("!=", ne),
    ("<", lt),
    (">", gt),
    ("<=", le),
    (">=", ge),
    ("not", not),
    ("and", and),
    ("or", or),
];

/* ===================== Arithmetic ===================== */

enum Num {
    Int(i64, i64),
    Flt(f64, f64),
}

fn pop_pair(ev: &mut Evaluator, op: &str) -> Result<Num, RuntimeError> {
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Num::Int(*x, *y)),
        (Value::Int(x), Value::Flt(y)) => Ok(Num::Flt(*x as f64, *y)),
        (Value::Flt(x), Value::Int(y)) => Ok(Num::Flt(*x, *y as f64)),
        (Value::Flt(x), Value::Flt(y)) => Ok(Num::Flt(*x, *y)),
        (Value::Int(_) | Value::Flt(_), other) | (other, _) => Err(mismatch(op, "Num", other)),
    }
}

fn overflow(op: &str) -> RuntimeError {
    RuntimeError::Arithmetic {
        message: format!("integer overflow in `{}`", op),
    }
}

fn division_by_zero() -> RuntimeError {
    RuntimeError::Arithmetic {
        message: "division by zero".to_string(),
    }
}

fn arith(
    ev: &mut Evaluator,
    op: &str,
    int: fn(i64, i64) -> Option<i64>,
    flt: fn(f64, f64) -> f64,
) -> OpResult {
    let result = match pop_pair(ev, op)? {
        Num::Int(a, b) => Value::Int(int(a, b).ok_or_else(|| overflow(op))?),
        Num::Flt(a, b) => Value::Flt(flt(a, b)),
    };
    ev.stack.push(result);
    Ok(())
}

pub fn add(ev: &mut Evaluator) -> OpResult {
    arith(ev, "+", i64::checked_add, |a, b| a + b)
}

pub fn sub(ev: &mut Evaluator) -> OpResult {
    arith(ev, "-", i64::checked_sub, |a, b| a - b)
}

pub fn mul(ev: &mut Evaluator) -> OpResult {
    arith(ev, "*", i64::checked_mul, |a, b| a * b)
}

pub fn div(ev: &mut Evaluator) -> OpResult {
    let result = match pop_pair(ev, "/")? {
        Num::Int(_, 0) => return Err(division_by_zero().into()),
        Num::Int(a, b) => Value::Int(a.checked_div(b).ok_or_else(|| overflow("/"))?),
        Num::Flt(a, b) => Value::Flt(a / b),
    };
    ev.stack.push(result);
    Ok(())
}

pub fn rem(ev: &mut Evaluator) -> OpResult {
    let result = match pop_pair(ev, "%")? {
        Num::Int(_, 0) => return Err(division_by_zero().into()),
        Num::Int(a, b) => Value::Int(a.checked_rem(b).ok_or_else(|| overflow("%"))?),
        Num::Flt(a, b) => Value::Flt(a % b),
    };
    ev.stack.push(result);
    Ok(())
}

pub fn neg(ev: &mut Evaluator) -> OpResult {
    let result = match ev.stack.pop()? {
        Value::Int(n) => Value::Int(n.checked_neg().ok_or_else(|| overflow("neg"))?),
        Value::Flt(n) => Value::Flt(-n),
        other => return Err(mismatch("neg", "Num", &other).into()),
    };
    ev.stack.push(result);
    Ok(())
}

/* ===================== Comparison ===================== */

pub fn eq(ev: &mut Evaluator) -> OpResult {
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    ev.stack.push(Value::Bool(a == b));
    Ok(())
}

pub fn ne(ev: &mut Evaluator) -> OpResult {
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    ev.stack.push(Value::Bool(a != b));
    Ok(())
}

/// Order numbers numerically and strings lexically
fn compare(ev: &mut Evaluator, op: &str, accept: fn(Ordering) -> bool) -> OpResult {
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    let ordering = match (&a, &b) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Flt(y)) => (*x as f64).partial_cmp(y),
        (Value::Flt(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Flt(x), Value::Flt(y)) => x.partial_cmp(y),
        (Value::Int(_) | Value::Flt(_) | Value::Str(_), other) | (other, _) => {
            return Err(mismatch(op, "Num or Str", other).into())
        }
    };
    ev.stack.push(Value::Bool(ordering.is_some_and(accept)));
    Ok(())
}

pub fn lt(ev: &mut Evaluator) -> OpResult {
    compare(ev, "<", Ordering::is_lt)
}

pub fn gt(ev: &mut Evaluator) -> OpResult {
    compare(ev, ">", Ordering::is_gt)
}

pub fn le(ev: &mut Evaluator) -> OpResult {
    compare(ev, "<=", Ordering::is_le)
}

pub fn ge(ev: &mut Evaluator) -> OpResult {
    compare(ev, ">=", Ordering::is_ge)
}

/* ===================== Logic ===================== */

pub fn not(ev: &mut Evaluator) -> OpResult {
    let value = pop_bool(ev, "not")?;
    ev.stack.push(Value::Bool(!value));
    Ok(())
}

pub fn and(ev: &mut Evaluator) -> OpResult {
    let b = pop_bool(ev, "and")?;
    let a = pop_bool(ev, "and")?;
    ev.stack.push(Value::Bool(a && b));
    Ok(())
}

pub fn or(ev: &mut Evaluator) -> OpResult {
    let b = pop_bool(ev, "or")?;
    let a = pop_bool(ev, "or")?;
    ev.stack.push(Value::Bool(a || b));
    Ok(())
}
