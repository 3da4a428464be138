//! Parameter binding and return checking
//!
//! Declared types are either structural builtin types (`Int`, `Num`, `Any`,
//! ...) or user types, which resolve to the predicate `datadef` generated for
//! them (`Point` -> `point?`).

use std::rc::Rc;

use super::errors::RuntimeError;
use super::scope::Scope;
use super::stdlib::datadef;
use super::types::{Operation, Param, Params, Value};
use super::vm::Evaluator;

/// Pop and type-check the declared parameters.
///
/// The last declared parameter takes the shallowest operand. Returns the
/// bindings in declaration order without installing them anywhere.
pub fn collect(
    ev: &mut Evaluator,
    params: &Params,
    types: &Scope,
) -> Result<Vec<(Rc<str>, Value)>, RuntimeError> {
    let values = take_arguments(ev, params.len())?;
    let mut bindings = Vec::with_capacity(values.len());
    for (param, value) in params.params.iter().zip(values) {
        check_param(ev, param, &value, types)?;
        bindings.push((param.name.clone(), value));
    }
    Ok(bindings)
}

/// Pop, type-check and bind the declared parameters into the active scope.
///
/// User types in the signature resolve against that scope, which is the
/// activation scope when a closure is entered.
pub fn bind(ev: &mut Evaluator, params: &Params) -> Result<(), RuntimeError> {
    let values = take_arguments(ev, params.len())?;
    for (param, value) in params.params.iter().zip(values) {
        check_param(ev, param, &value, ev.scopes.active())?;
        ev.scopes.put(param.name.clone(), value);
    }
    Ok(())
}

fn take_arguments(ev: &mut Evaluator, wanted: usize) -> Result<Vec<Value>, RuntimeError> {
    let available = ev.stack.accessible_count();
    if available < wanted {
        return Err(RuntimeError::arity(format!(
            "expected {} argument{} but only {} {} available",
            wanted,
            if wanted == 1 { "" } else { "s" },
            available,
            if available == 1 { "is" } else { "are" },
        )));
    }

    let mut values = Vec::with_capacity(wanted);
    for _ in 0..wanted {
        values.push(ev.stack.pop()?);
    }
    values.reverse();
    Ok(values)
}

fn check_param(
    ev: &Evaluator,
    param: &Param,
    value: &Value,
    types: &Scope,
) -> Result<(), RuntimeError> {
    let Some(ty) = &param.ty else {
        return Ok(());
    };
    if check_type(ev, ty, value, types)? {
        return Ok(());
    }
    Err(RuntimeError::type_mismatch(format!(
        "parameter `{}` expects {}, got {} {}",
        param.name,
        ty,
        value.type_name(),
        value
    )))
}

/// Verify the values produced above `floor` against the declared returns
pub fn check_returns(ev: &Evaluator, params: &Params, floor: usize) -> Result<(), RuntimeError> {
    let Some(returns) = &params.returns else {
        return Ok(());
    };

    let produced = ev.stack.count().saturating_sub(floor);
    if produced < returns.len() {
        return Err(RuntimeError::arity(format!(
            "expected {} return value{} but only {} {} produced",
            returns.len(),
            if returns.len() == 1 { "" } else { "s" },
            produced,
            if produced == 1 { "was" } else { "were" },
        )));
    }
    if produced > returns.len() {
        return Err(RuntimeError::arity(format!(
            "expected {} return value{} but {} were left on the stack",
            returns.len(),
            if returns.len() == 1 { "" } else { "s" },
            produced,
        )));
    }

    let scope = ev.scopes.active();
    for (idx, (ty, value)) in returns.iter().zip(ev.stack.values_from(floor)).enumerate() {
        if !check_type(ev, ty, value, scope)? {
            return Err(RuntimeError::type_mismatch(format!(
                "return value {} expects {}, got {} {}",
                idx + 1,
                ty,
                value.type_name(),
                value
            )));
        }
    }
    Ok(())
}

/// Does `value` satisfy type `ty`?
///
/// User types are looked up in `types` first, then in the active scope.
/// A type that resolves to nothing usable is an error, not a mismatch.
pub fn check_type(
    ev: &Evaluator,
    ty: &str,
    value: &Value,
    types: &Scope,
) -> Result<bool, RuntimeError> {
    if let Some(ok) = value.is_assignable_to(ty) {
        return Ok(ok);
    }

    let predicate = format!("{}?", ty.to_lowercase());
    let resolved = types
        .get(&predicate)
        .or_else(|| ev.scopes.get(&predicate));

    match resolved {
        Some(Value::Op(op_ref)) => match &op_ref.op {
            Operation::Data(op) => {
                datadef::test_predicate(op, value).ok_or_else(|| RuntimeError::unknown_type(ty))
            }
            Operation::Builtin(_) => Err(RuntimeError::unknown_type(ty)),
        },
        _ => Err(RuntimeError::unknown_type(ty)),
    }
}
