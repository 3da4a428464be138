//! Array and string operators
//!
//! Writes go through `Rc::make_mut`: an array shared with a binding or
//! another stack slot is copied before it is modified.

use std::rc::Rc;

use super::{mismatch, pop_int};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::types::{OpResult, Value};
use crate::interpreter::vm::Evaluator;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[
    ("append", append),
    ("len", len),
    ("nth", nth),
    ("concat", concat),
];

/// `[items] value append`
pub fn append(ev: &mut Evaluator) -> OpResult {
    let value = ev.stack.pop()?;
    match ev.stack.pop()? {
        Value::Arr(mut items) => {
            Rc::make_mut(&mut items).push(value);
            ev.stack.push(Value::Arr(items));
            Ok(())
        }
        other => Err(mismatch("append", "Arr", &other).into()),
    }
}

pub fn len(ev: &mut Evaluator) -> OpResult {
    let count = match ev.stack.pop()? {
        Value::Arr(items) | Value::ExeArr(items) => items.len(),
        Value::Str(text) => text.chars().count(),
        other => return Err(mismatch("len", "Arr or Str", &other).into()),
    };
    ev.stack.push(Value::Int(count as i64));
    Ok(())
}

fn index_error(index: i64, len: usize) -> RuntimeError {
    RuntimeError::type_mismatch(format!(
        "index {} is out of bounds for length {}",
        index, len
    ))
}

/// `[items] index nth`; strings index by character
pub fn nth(ev: &mut Evaluator) -> OpResult {
    let index = pop_int(ev, "nth")?;
    let element = match ev.stack.pop()? {
        Value::Arr(items) => usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or_else(|| index_error(index, items.len()))?,
        Value::Str(text) => usize::try_from(index)
            .ok()
            .and_then(|i| text.chars().nth(i))
            .map(|c| Value::str(&c.to_string()))
            .ok_or_else(|| index_error(index, text.chars().count()))?,
        other => return Err(mismatch("nth", "Arr or Str", &other).into()),
    };
    ev.stack.push(element);
    Ok(())
}

pub fn concat(ev: &mut Evaluator) -> OpResult {
    let b = ev.stack.pop()?;
    let a = ev.stack.pop()?;
    let joined = match (a, b) {
        (Value::Arr(mut head), Value::Arr(tail)) => {
            Rc::make_mut(&mut head).extend(tail.iter().cloned());
            Value::Arr(head)
        }
        (Value::Str(head), Value::Str(tail)) => Value::str(&format!("{}{}", head, tail)),
        (Value::Arr(_), other) | (Value::Str(_), other) | (other, _) => {
            return Err(mismatch("concat", "two arrays or two strings", &other).into())
        }
    };
    ev.stack.push(joined);
    Ok(())
}
