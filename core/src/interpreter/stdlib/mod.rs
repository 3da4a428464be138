//! Standard operator set
//!
//! Every module exposes its operators as plain functions over the evaluator
//! and lists them in an `OPS` table; `install` registers them all.

pub mod arrays;
pub mod assert;
pub mod control;
pub mod datadef;
pub mod effects;
pub mod math;
pub mod stack_ops;

use std::rc::Rc;

use super::errors::RuntimeError;
use super::registry::Registry;
use super::types::Value;
use super::vm::Evaluator;

/// Register the standard operators
pub fn install(registry: &mut Registry) {
    registry.register_all(control::OPS);
    registry.register_all(datadef::OPS);
    registry.register_all(stack_ops::OPS);
    registry.register_all(math::OPS);
    registry.register_all(arrays::OPS);
    registry.register_all(effects::OPS);
    registry.register_all(assert::OPS);
}

/* ===================== Operand Helpers ===================== */

pub(crate) fn mismatch(op: &str, expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::type_mismatch(format!(
        "`{}` expects {}, got {} {}",
        op,
        expected,
        got.type_name(),
        got
    ))
}

pub(crate) fn pop_int(ev: &mut Evaluator, op: &str) -> Result<i64, RuntimeError> {
    match ev.stack.pop()? {
        Value::Int(n) => Ok(n),
        other => Err(mismatch(op, "Int", &other)),
    }
}

pub(crate) fn pop_bool(ev: &mut Evaluator, op: &str) -> Result<bool, RuntimeError> {
    match ev.stack.pop()? {
        Value::Bool(b) => Ok(b),
        other => Err(mismatch(op, "Bool", &other)),
    }
}

pub(crate) fn pop_str(ev: &mut Evaluator, op: &str) -> Result<Rc<str>, RuntimeError> {
    match ev.stack.pop()? {
        Value::Str(s) => Ok(s),
        other => Err(mismatch(op, "Str", &other)),
    }
}

pub(crate) fn pop_sym(ev: &mut Evaluator, op: &str) -> Result<Rc<str>, RuntimeError> {
    match ev.stack.pop()? {
        Value::Sym(s) => Ok(s),
        other => Err(mismatch(op, "a name", &other)),
    }
}

/// Pop a quotation body (`{ ... }`)
pub(crate) fn pop_body(ev: &mut Evaluator, op: &str) -> Result<Rc<Vec<Value>>, RuntimeError> {
    match ev.stack.pop()? {
        Value::ExeArr(code) => Ok(code),
        other => Err(mismatch(op, "a quotation", &other)),
    }
}

/// Pop any invokable value (quotation, closure or operation)
pub(crate) fn pop_callable(ev: &mut Evaluator, op: &str) -> Result<Value, RuntimeError> {
    let value = ev.stack.pop()?;
    match value {
        Value::ExeArr(_) | Value::Lam(_) | Value::Op(_) => Ok(value),
        other => Err(mismatch(op, "a quotation", &other)),
    }
}
