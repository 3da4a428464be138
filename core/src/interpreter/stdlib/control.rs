//! Control-flow operators
//!
//! None of these recurse on the host stack: each pushes the frames that
//! describe the work and returns, and the execution loop steps through
//! them one element at a time.

use std::rc::Rc;
use std::sync::Arc;

use super::{mismatch, pop_body, pop_bool, pop_callable, pop_int, pop_sym};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::registry::Builtin;
use crate::interpreter::types::{
    CondPhase, ForSource, Frame, Lambda, OpRef, OpResult, Operation, Params, Signal, Value,
};
use crate::interpreter::vm::Evaluator;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[
    ("if", if_op),
    ("cond", cond),
    ("fun", fun),
    ("lam", lam),
    ("cond-fun", cond_fun),
    ("loop", loop_op),
    ("for", for_op),
    ("fori", fori),
    ("break", break_op),
    ("breakif", breakif),
    ("tailcall", tailcall),
    ("call", call),
    ("def", def),
    ("try", try_op),
];

/* ===================== Branching ===================== */

/// `cond {then} if` or `cond {then} {else} if`
///
/// The else form is recognised by a second quotation under the first.
pub fn if_op(ev: &mut Evaluator) -> OpResult {
    let first = ev.stack.pop()?;
    if !first.is_quotation() {
        return Err(mismatch("if", "a quotation", &first).into());
    }

    let has_else = ev
        .stack
        .peek(0)
        .map(|v| v.is_quotation())
        .unwrap_or(false);
    let (then_branch, else_branch) = if has_else {
        (ev.stack.pop()?, Some(first))
    } else {
        (first, None)
    };

    if pop_bool(ev, "if")? {
        ev.invoke(then_branch)
    } else if let Some(else_branch) = else_branch {
        ev.invoke(else_branch)
    } else {
        Ok(())
    }
}

/// `[ {test} {action} ... ] cond`
pub fn cond(ev: &mut Evaluator) -> OpResult {
    let items = match ev.stack.pop()? {
        Value::Arr(items) => items,
        other => return Err(mismatch("cond", "an array of pairs", &other).into()),
    };
    let pairs = pair_up(&items)?;
    ev.push_frame(Frame::Cond {
        pairs: Rc::new(pairs),
        index: 0,
        phase: CondPhase::Test,
    })
}

fn pair_up(items: &[Value]) -> Result<Vec<(Value, Value)>, RuntimeError> {
    if items.len() % 2 != 0 {
        return Err(RuntimeError::arity(format!(
            "cond expects condition/action pairs, got {} element{}",
            items.len(),
            if items.len() == 1 { "" } else { "s" }
        )));
    }
    items
        .chunks(2)
        .map(|pair| {
            for part in pair {
                if !matches!(part, Value::ExeArr(_) | Value::Lam(_) | Value::Op(_)) {
                    return Err(mismatch("cond", "quotation pairs", part));
                }
            }
            Ok((pair[0].clone(), pair[1].clone()))
        })
        .collect()
}

/* ===================== Closures ===================== */

fn pop_signature(ev: &mut Evaluator) -> Result<Option<Rc<Params>>, RuntimeError> {
    if matches!(ev.stack.peek(0), Ok(Value::Params(_))) {
        if let Value::Params(params) = ev.stack.pop()? {
            return Ok(Some(params));
        }
    }
    Ok(None)
}

/// `Name: (params)? {body} fun`
pub fn fun(ev: &mut Evaluator) -> OpResult {
    let body = pop_body(ev, "fun")?;
    let params = pop_signature(ev)?;
    let name = pop_sym(ev, "fun")?;
    let lam = Lambda::new(Some(name.clone()), body, params, ev.scopes.copy_scope());
    ev.define(&name, Value::Lam(lam))?;
    Ok(())
}

/// `(params)? {body} lam`
pub fn lam(ev: &mut Evaluator) -> OpResult {
    let body = pop_body(ev, "lam")?;
    let params = pop_signature(ev)?;
    let lam = Lambda::new(None, body, params, ev.scopes.copy_scope());
    ev.stack.push(Value::Lam(lam));
    Ok(())
}

/// `Name: (params)? [ {test} {action} ... ] cond-fun`
pub fn cond_fun(ev: &mut Evaluator) -> OpResult {
    let pairs = match ev.stack.pop()? {
        Value::Arr(items) => {
            pair_up(&items)?;
            items
        }
        other => return Err(mismatch("cond-fun", "an array of pairs", &other).into()),
    };
    let params = pop_signature(ev)?;
    let name = pop_sym(ev, "cond-fun")?;

    let cond_op = Value::Op(OpRef {
        op: Operation::Builtin(Builtin {
            name: Arc::from("cond"),
            func: Arc::new(cond),
        }),
        origin: ev.origin,
    });
    let body = Rc::new(vec![Value::Arr(pairs), cond_op]);
    let lam = Lambda::new(Some(name.clone()), body, params, ev.scopes.copy_scope());
    ev.define(&name, Value::Lam(lam))?;
    Ok(())
}

/// Explicitly invoke the top quotation, closure or operation
pub fn call(ev: &mut Evaluator) -> OpResult {
    let callable = pop_callable(ev, "call")?;
    ev.invoke(callable)
}

/// `value Name: def`
pub fn def(ev: &mut Evaluator) -> OpResult {
    let name = pop_sym(ev, "def")?;
    let value = ev.stack.pop()?;
    ev.define(&name, value)?;
    Ok(())
}

/* ===================== Loops ===================== */

pub fn loop_op(ev: &mut Evaluator) -> OpResult {
    let body = pop_body(ev, "loop")?;
    ev.push_frame(Frame::Loop { body })
}

pub fn for_op(ev: &mut Evaluator) -> OpResult {
    iterate(ev, "for", false)
}

pub fn fori(ev: &mut Evaluator) -> OpResult {
    iterate(ev, "fori", true)
}

/// `start end {body}`, `[items] {body}` or `"text" {body}`
fn iterate(ev: &mut Evaluator, op: &str, with_index: bool) -> OpResult {
    let body = pop_body(ev, op)?;
    let source = match ev.stack.pop()? {
        Value::Int(end) => {
            let start = pop_int(ev, op)?;
            ForSource::Range { start, end }
        }
        Value::Arr(items) => ForSource::Items(items),
        Value::Str(text) => ForSource::Chars(text.chars().collect::<Vec<_>>().into()),
        other => return Err(mismatch(op, "a range, array or string", &other).into()),
    };
    ev.push_frame(Frame::For {
        source,
        index: 0,
        with_index,
        body,
    })
}

pub fn break_op(_ev: &mut Evaluator) -> OpResult {
    Err(Signal::Break)
}

pub fn breakif(ev: &mut Evaluator) -> OpResult {
    if pop_bool(ev, "breakif")? {
        return Err(Signal::Break);
    }
    Ok(())
}

/* ===================== Tail Calls ===================== */

/// Replace the running closure activation with a call to the target.
///
/// The target is a closure value or the symbol of a closure in scope
/// (`'recur tailcall`).
pub fn tailcall(ev: &mut Evaluator) -> OpResult {
    let target = match ev.stack.pop()? {
        Value::Lam(lam) => lam,
        Value::Sym(name) => match ev.scopes.get(&name) {
            Some(Value::Lam(lam)) => lam.clone(),
            Some(other) => return Err(mismatch("tailcall", "a closure", other).into()),
            None => {
                return Err(RuntimeError::UnknownReference {
                    name: name.to_string(),
                }
                .into())
            }
        },
        other => return Err(mismatch("tailcall", "a closure", &other).into()),
    };
    Err(Signal::TailCall(target))
}

/* ===================== Errors ===================== */

/// `{body} try`: runs the body; a failure inside it restores the stack to
/// its height at entry and pushes the error value instead.
pub fn try_op(ev: &mut Evaluator) -> OpResult {
    let body = pop_callable(ev, "try")?;
    let height = ev.stack.count();
    ev.push_frame(Frame::Try { height })?;
    ev.invoke(body)
}
