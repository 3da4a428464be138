//! Runtime value types
//!
//! `Value` is a closed set of tagged kinds. Heap payloads sit behind `Rc`,
//! so pushing or binding a value shares it; arrays are copied on write via
//! `Rc::make_mut` whenever they are shared.

use std::fmt;
use std::rc::Rc;

use super::super::errors::LocatedError;
use super::super::scope::Scope;
use super::datatype::DataOp;
use super::params::Params;
use super::token::Origin;
use crate::interpreter::registry::Builtin;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Flt(f64),
    Bool(bool),
    Str(Rc<str>),
    Sym(Rc<str>),
    Nil,
    Arr(Rc<Vec<Value>>),
    /// Quotation: pushed as data, runs its contents when invoked
    ExeArr(Rc<Vec<Value>>),
    Lam(Rc<Lambda>),
    Op(OpRef),
    Params(Rc<Params>),
    Marker(Marker),
    Ref(Rc<Reference>),
    Err(Rc<LocatedError>),
}

/// Structural delimiter left on the stack while a container is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    ArrayOpen,
    /// `]` collected inside a quotation; builds the array when the body runs
    ArrayClose,
    QuoteOpen,
    ParamsOpen,
    Arrow,
}

impl Marker {
    /// Source spelling of the delimiter
    pub fn symbol(self) -> &'static str {
        match self {
            Marker::ArrayOpen => "[",
            Marker::ArrayClose => "]",
            Marker::QuoteOpen => "{",
            Marker::ParamsOpen => "(",
            Marker::Arrow => "->",
        }
    }
}

/// Unresolved name captured inside a quotation or parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: Rc<str>,
    pub origin: Origin,
}

/// Operation reference plus the site it was written at
#[derive(Clone)]
pub struct OpRef {
    pub op: Operation,
    pub origin: Origin,
}

#[derive(Clone)]
pub enum Operation {
    Builtin(Builtin),
    /// Generated by `datadef`
    Data(Rc<DataOp>),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Builtin(builtin) => &builtin.name,
            Operation::Data(op) => op.name(),
        }
    }
}

/* ===================== Closures ===================== */

/// Closure: quotation body, frozen scope snapshot and optional signature
///
/// The snapshot never stores the closure itself. `activation_scope` adds the
/// `recur` self-binding (and the closure's own name for named functions)
/// each time the closure is entered, which keeps the `Rc` graph acyclic.
pub struct Lambda {
    pub name: Option<Rc<str>>,
    pub body: Rc<Vec<Value>>,
    pub params: Option<Rc<Params>>,
    pub scope: Scope,
}

pub const RECUR: &str = "recur";

impl Lambda {
    pub fn new(
        name: Option<Rc<str>>,
        body: Rc<Vec<Value>>,
        params: Option<Rc<Params>>,
        scope: Scope,
    ) -> Rc<Self> {
        Rc::new(Lambda {
            name,
            body,
            params,
            scope,
        })
    }

    /// Scope installed while this closure runs
    pub fn activation_scope(self: &Rc<Self>) -> Scope {
        let mut scope = self.scope.clone();
        scope.insert(RECUR, Value::Lam(self.clone()));
        if let Some(name) = &self.name {
            scope.insert(name.clone(), Value::Lam(self.clone()));
        }
        scope
    }
}

/* ===================== Shared Behaviour ===================== */

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn sym(s: &str) -> Value {
        Value::Sym(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Arr(Rc::new(items))
    }

    pub fn quote(items: Vec<Value>) -> Value {
        Value::ExeArr(Rc::new(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Flt(_) => "Flt",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "Str",
            Value::Sym(_) => "Sym",
            Value::Nil => "Nil",
            Value::Arr(_) => "Arr",
            Value::ExeArr(_) => "ExeArr",
            Value::Lam(_) => "Lam",
            Value::Op(_) => "Op",
            Value::Params(_) => "Params",
            Value::Marker(_) => "Marker",
            Value::Ref(_) => "Ref",
            Value::Err(_) => "Err",
        }
    }

    /// Structural type check against a builtin type name.
    ///
    /// Returns `None` when `ty` is not a builtin type, in which case the
    /// caller resolves it as a user type through its generated predicate.
    /// `Nil` is not an `Any`.
    pub fn is_assignable_to(&self, ty: &str) -> Option<bool> {
        let ok = match ty {
            "Any" => !matches!(self, Value::Nil),
            "Num" => matches!(self, Value::Int(_) | Value::Flt(_)),
            "Quot" | "ExeArr" => matches!(self, Value::ExeArr(_) | Value::Lam(_)),
            "Fn" => matches!(self, Value::ExeArr(_) | Value::Lam(_) | Value::Op(_)),
            "Int" | "Flt" | "Bool" | "Str" | "Sym" | "Nil" | "Arr" | "Lam" | "Op" | "Params"
            | "Err" => self.type_name() == ty,
            _ => return None,
        };
        Some(ok)
    }

    pub fn is_quotation(&self) -> bool {
        matches!(self, Value::ExeArr(_) | Value::Lam(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Flt(a), Value::Flt(b)) => a == b,
            (Value::Int(a), Value::Flt(b)) | (Value::Flt(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Arr(a), Value::Arr(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::ExeArr(a), Value::ExeArr(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Lam(a), Value::Lam(b)) => Rc::ptr_eq(a, b),
            (Value::Op(a), Value::Op(b)) => a.op.name() == b.op.name(),
            (Value::Params(a), Value::Params(b)) => a == b,
            (Value::Marker(a), Value::Marker(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a.name == b.name,
            (Value::Err(a), Value::Err(b)) => a == b,
            _ => false,
        }
    }
}

/* ===================== Display ===================== */

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value], sep: &str) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Flt(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            Value::Flt(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Sym(v) => write!(f, "'{v}"),
            Value::Nil => write!(f, "nil"),
            Value::Arr(items) => {
                write!(f, "[")?;
                write_seq(f, items, ", ")?;
                write!(f, "]")
            }
            Value::ExeArr(items) => {
                write!(f, "{{ ")?;
                write_seq(f, items, " ")?;
                write!(f, " }}")
            }
            Value::Lam(lam) => match &lam.name {
                Some(name) => write!(f, "<fun {name}>"),
                None => write!(f, "<lam>"),
            },
            Value::Op(op) => write!(f, "{}", op.op.name()),
            Value::Params(params) => write!(f, "{params}"),
            Value::Marker(marker) => write!(f, "{}", marker.symbol()),
            Value::Ref(reference) => write!(f, "{}", reference.name),
            Value::Err(err) => write!(f, "<error: {err}>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self)
    }
}

impl fmt::Debug for OpRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op({} @ {})", self.op.name(), self.origin)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body_len", &self.body.len())
            .finish()
    }
}
