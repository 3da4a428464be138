//! Operations generated by `datadef`
//!
//! A datadef type has no runtime descriptor of its own; it exists only as
//! these generated scope entries. Struct instances are plain arrays:
//! `[STRUCT_TAG, 'TypeName, field0, field1, ...]`.

use std::rc::Rc;

use super::super::scope::Scope;
use super::params::Params;

/// Discriminant symbol in slot 0 of every struct instance
pub const STRUCT_TAG: &str = "#struct";

/// Index of the first field in a struct instance
pub const FIELD_BASE: usize = 2;

/// Field accessor data shared by getters, setters and updaters
#[derive(Debug, Clone)]
pub struct FieldSlot {
    /// Owning struct type (`Point`)
    pub ty: Rc<str>,
    /// Field name as declared
    pub field: Rc<str>,
    /// Absolute index inside the instance array
    pub index: usize,
    /// Declared field type, if any
    pub field_ty: Option<Rc<str>>,
}

#[derive(Debug)]
pub enum DataOp {
    /// `point`: pops fields in declaration order and pushes an instance
    Construct {
        name: Rc<str>,
        ty: Rc<str>,
        fields: Rc<Params>,
        scope: Rc<Scope>,
    },
    /// `point?`
    Predicate { name: Rc<str>, ty: Rc<str> },
    /// `shape?` for a union: true when any variant predicate matches
    UnionPredicate {
        name: Rc<str>,
        ty: Rc<str>,
        variants: Vec<Rc<str>>,
    },
    /// `point-x`
    Get { name: Rc<str>, slot: FieldSlot },
    /// `point-x-set`
    Set {
        name: Rc<str>,
        slot: FieldSlot,
        scope: Rc<Scope>,
    },
    /// `point-x-do`
    Update {
        name: Rc<str>,
        slot: FieldSlot,
        scope: Rc<Scope>,
    },
}

impl DataOp {
    pub fn name(&self) -> &str {
        match self {
            DataOp::Construct { name, .. }
            | DataOp::Predicate { name, .. }
            | DataOp::UnionPredicate { name, .. }
            | DataOp::Get { name, .. }
            | DataOp::Set { name, .. }
            | DataOp::Update { name, .. } => name,
        }
    }
}
