//! Stack shuffling
//!
//! Duplicates share the value; arrays are copied only when later written.

use crate::interpreter::types::{OpResult, Value};
use crate::interpreter::vm::Evaluator;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[
    ("dup", dup),
    ("pop", pop),
    ("swap", swap),
    ("over", over),
    ("rot", rot),
    ("clear", clear),
    ("depth", depth),
];

pub fn dup(ev: &mut Evaluator) -> OpResult {
    let top = ev.stack.peek(0)?.clone();
    ev.stack.push(top);
    Ok(())
}

pub fn pop(ev: &mut Evaluator) -> OpResult {
    ev.stack.pop()?;
    Ok(())
}

pub fn swap(ev: &mut Evaluator) -> OpResult {
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    ev.stack.push(b);
    ev.stack.push(a);
    Ok(())
}

pub fn over(ev: &mut Evaluator) -> OpResult {
    let below = ev.stack.peek(1)?.clone();
    ev.stack.push(below);
    Ok(())
}

/// `a b c -> b c a`
pub fn rot(ev: &mut Evaluator) -> OpResult {
    let c = ev.stack.pop()?;
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    ev.stack.push(b);
    ev.stack.push(c);
    ev.stack.push(a);
    Ok(())
}

/// Drop every accessible value
pub fn clear(ev: &mut Evaluator) -> OpResult {
    let floor = ev.stack.floor();
    ev.stack.truncate(floor);
    Ok(())
}

pub fn depth(ev: &mut Evaluator) -> OpResult {
    let count = ev.stack.accessible_count() as i64;
    ev.stack.push(Value::Int(count));
    Ok(())
}
