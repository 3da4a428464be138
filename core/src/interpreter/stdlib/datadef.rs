//! `datadef`: struct and union generation
//!
//! `Point: (x :Num, y :Num) datadef` installs
//! - `point` constructor, binding and type-checking the fields
//! - `point?` predicate
//! - `point-x`, `point-x-set` and `point-x-do` per field
//!
//! `Shape: [Circle: (r :Num) Square: (side :Num)] datadef` defines each
//! variant as a struct and adds the union predicate `shape?`.
//!
//! Every predicate of one declaration is visible to every constructor and
//! accessor it generates, so field types may name any type of the group
//! (including the group's own union) regardless of declaration order.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use super::{mismatch, pop_callable, pop_sym};
use crate::interpreter::binder;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::scope::Scope;
use crate::interpreter::types::{
    DataOp, FieldSlot, Frame, OpRef, OpResult, Operation, Params, Value, FIELD_BASE, STRUCT_TAG,
};
use crate::interpreter::vm::Evaluator;

pub const OPS: &[(&str, fn(&mut Evaluator) -> OpResult)] = &[("datadef", datadef)];

/* ===================== Declaration ===================== */

/// A validated declaration, nothing installed yet
struct Declaration {
    name: Rc<str>,
    structs: Vec<(Rc<str>, Rc<Params>)>,
    union: bool,
}

pub fn datadef(ev: &mut Evaluator) -> OpResult {
    let body = ev.stack.pop()?;
    let name = pop_sym(ev, "datadef")?;
    let decl = parse(name, body)?;

    let ops = generate(ev, &decl);
    for op in &ops {
        if ev.is_builtin(op.name()) {
            return Err(RuntimeError::conflict(format!(
                "datadef `{}` would redefine builtin `{}`",
                decl.name,
                op.name()
            ))
            .into());
        }
    }

    debug!(
        name = %decl.name,
        variants = decl.structs.len(),
        generated = ops.len(),
        "datadef"
    );
    let origin = ev.origin;
    for op in ops {
        let name: Rc<str> = Rc::from(op.name());
        ev.scopes.put(
            name,
            Value::Op(OpRef {
                op: Operation::Data(op),
                origin,
            }),
        );
    }
    Ok(())
}

fn parse(name: Rc<str>, body: Value) -> Result<Declaration, RuntimeError> {
    check_type_name(&name)?;
    match body {
        Value::Params(fields) => {
            check_fields(&name, &fields)?;
            Ok(Declaration {
                structs: vec![(name.clone(), fields)],
                name,
                union: false,
            })
        }
        Value::Arr(items) => {
            if items.is_empty() || items.len() % 2 != 0 {
                return Err(RuntimeError::conflict(format!(
                    "union `{}` expects variant name and field list pairs",
                    name
                )));
            }
            let mut seen = HashSet::new();
            let mut structs = Vec::with_capacity(items.len() / 2);
            for pair in items.chunks(2) {
                let variant = match &pair[0] {
                    Value::Sym(variant) => variant.clone(),
                    other => {
                        return Err(RuntimeError::conflict(format!(
                            "union `{}` expects a variant name, got {}",
                            name, other
                        )))
                    }
                };
                check_type_name(&variant)?;
                if variant == name || !seen.insert(variant.clone()) {
                    return Err(RuntimeError::conflict(format!(
                        "union `{}` declares `{}` twice",
                        name, variant
                    )));
                }
                let fields = match &pair[1] {
                    Value::Params(fields) => fields.clone(),
                    other => return Err(not_a_field_list(&variant, other)),
                };
                check_fields(&variant, &fields)?;
                structs.push((variant, fields));
            }
            Ok(Declaration {
                name,
                structs,
                union: true,
            })
        }
        other => Err(not_a_field_list(&name, &other)),
    }
}

fn not_a_field_list(name: &str, got: &Value) -> RuntimeError {
    let what = match got {
        Value::Lam(_) | Value::ExeArr(_) => "a closure",
        other => other.type_name(),
    };
    RuntimeError::conflict(format!(
        "datadef `{}` expects a field list, got {}",
        name, what
    ))
}

fn check_type_name(name: &str) -> Result<(), RuntimeError> {
    match name.chars().next() {
        Some(c) if c.is_uppercase() => Ok(()),
        _ => Err(RuntimeError::conflict(format!(
            "type name `{}` must start with an uppercase letter",
            name
        ))),
    }
}

fn check_fields(ty: &str, fields: &Params) -> Result<(), RuntimeError> {
    if fields.returns.is_some() {
        return Err(RuntimeError::conflict(format!(
            "fields of `{}` cannot declare return types",
            ty
        )));
    }
    let mut seen = HashSet::new();
    for param in &fields.params {
        if !seen.insert(param.name.clone()) {
            return Err(RuntimeError::conflict(format!(
                "field `{}` of `{}` is declared twice",
                param.name, ty
            )));
        }
    }
    Ok(())
}

/* ===================== Generation ===================== */

fn generate(ev: &Evaluator, decl: &Declaration) -> Vec<Rc<DataOp>> {
    let mut predicates = Vec::new();
    for (ty, _) in &decl.structs {
        predicates.push(Rc::new(DataOp::Predicate {
            name: Rc::from(format!("{}?", ty.to_lowercase())),
            ty: ty.clone(),
        }));
    }
    if decl.union {
        predicates.push(Rc::new(DataOp::UnionPredicate {
            name: Rc::from(format!("{}?", decl.name.to_lowercase())),
            ty: decl.name.clone(),
            variants: decl.structs.iter().map(|(ty, _)| ty.clone()).collect(),
        }));
    }

    let mut group = ev.scopes.copy_scope();
    for predicate in &predicates {
        group.insert(
            predicate.name(),
            Value::Op(OpRef {
                op: Operation::Data(predicate.clone()),
                origin: ev.origin,
            }),
        );
    }
    let group = Rc::new(group);

    let mut ops = predicates;
    for (ty, fields) in &decl.structs {
        let base = ty.to_lowercase();
        ops.push(Rc::new(DataOp::Construct {
            name: Rc::from(base.as_str()),
            ty: ty.clone(),
            fields: fields.clone(),
            scope: group.clone(),
        }));
        for (idx, param) in fields.params.iter().enumerate() {
            let slot = FieldSlot {
                ty: ty.clone(),
                field: param.name.clone(),
                index: FIELD_BASE + idx,
                field_ty: param.ty.clone(),
            };
            let getter = format!("{}-{}", base, param.name);
            ops.push(Rc::new(DataOp::Set {
                name: Rc::from(format!("{}-set", getter)),
                slot: slot.clone(),
                scope: group.clone(),
            }));
            ops.push(Rc::new(DataOp::Update {
                name: Rc::from(format!("{}-do", getter)),
                slot: slot.clone(),
                scope: group.clone(),
            }));
            ops.push(Rc::new(DataOp::Get {
                name: Rc::from(getter),
                slot,
            }));
        }
    }
    ops
}

/* ===================== Generated Operations ===================== */

/// Run a generated operation
pub fn invoke(ev: &mut Evaluator, op: &Rc<DataOp>) -> OpResult {
    match op.as_ref() {
        DataOp::Construct {
            ty, fields, scope, ..
        } => {
            let bindings = binder::collect(ev, fields, scope)?;
            let mut instance = Vec::with_capacity(FIELD_BASE + bindings.len());
            instance.push(Value::sym(STRUCT_TAG));
            instance.push(Value::Sym(ty.clone()));
            instance.extend(bindings.into_iter().map(|(_, value)| value));
            ev.stack.push(Value::array(instance));
            Ok(())
        }
        DataOp::Predicate { .. } | DataOp::UnionPredicate { .. } => {
            let value = ev.stack.pop()?;
            let matched = test_predicate(op, &value).unwrap_or(false);
            ev.stack.push(Value::Bool(matched));
            Ok(())
        }
        DataOp::Get { name, slot } => {
            let instance = pop_instance(ev, name, slot)?;
            ev.stack.push(instance[slot.index].clone());
            Ok(())
        }
        DataOp::Set { name, slot, scope } => {
            let value = ev.stack.pop()?;
            let instance = pop_instance(ev, name, slot)?;
            write_back(ev, instance, slot, scope, value)?;
            Ok(())
        }
        DataOp::Update { name, slot, scope } => {
            let func = pop_callable(ev, name)?;
            let instance = pop_instance(ev, name, slot)?;
            let current = instance[slot.index].clone();
            let floor = ev.stack.forbid_pop();
            let frame = Frame::Update {
                instance,
                slot: slot.clone(),
                scope: scope.clone(),
                floor,
            };
            if let Err(signal) = ev.push_frame(frame) {
                ev.stack.allow_pop(floor);
                return Err(signal);
            }
            ev.stack.push(current);
            ev.invoke(func)
        }
    }
}

/// Type tag of a struct instance
fn instance_type(value: &Value) -> Option<&Rc<str>> {
    let Value::Arr(items) = value else {
        return None;
    };
    match (items.first(), items.get(1)) {
        (Some(Value::Sym(tag)), Some(Value::Sym(ty))) if &**tag == STRUCT_TAG => Some(ty),
        _ => None,
    }
}

/// Evaluate a predicate op against `value`; `None` if `op` is not a predicate
pub fn test_predicate(op: &DataOp, value: &Value) -> Option<bool> {
    match op {
        DataOp::Predicate { ty, .. } => Some(instance_type(value) == Some(ty)),
        DataOp::UnionPredicate { variants, .. } => Some(
            instance_type(value).is_some_and(|ty| variants.iter().any(|variant| variant == ty)),
        ),
        DataOp::Construct { .. }
        | DataOp::Get { .. }
        | DataOp::Set { .. }
        | DataOp::Update { .. } => None,
    }
}

fn pop_instance(
    ev: &mut Evaluator,
    op: &str,
    slot: &FieldSlot,
) -> Result<Rc<Vec<Value>>, RuntimeError> {
    let value = ev.stack.pop()?;
    let matches = instance_type(&value).is_some_and(|ty| *ty == slot.ty);
    match value {
        Value::Arr(items) if matches && items.len() > slot.index => Ok(items),
        other => Err(mismatch(op, &slot.ty, &other)),
    }
}

/// Type-check `value` for the slot and store it, copying the instance
/// first if it is shared.
pub fn write_back(
    ev: &mut Evaluator,
    mut instance: Rc<Vec<Value>>,
    slot: &FieldSlot,
    scope: &Rc<Scope>,
    value: Value,
) -> Result<(), RuntimeError> {
    if let Some(ty) = &slot.field_ty {
        if !binder::check_type(ev, ty, &value, scope)? {
            return Err(RuntimeError::type_mismatch(format!(
                "field `{}` of {} expects {}, got {} {}",
                slot.field,
                slot.ty,
                ty,
                value.type_name(),
                value
            )));
        }
    }
    Rc::make_mut(&mut instance)[slot.index] = value;
    ev.stack.push(Value::Arr(instance));
    Ok(())
}
