//! Control flow and execution frame types

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use super::super::errors::{LocatedError, RuntimeError};
use super::super::scope::Scope;
use super::datatype::FieldSlot;
use super::token::Token;
use super::values::{Lambda, Value};

/* ===================== Signals ===================== */

/// Result of invoking an operation
pub type OpResult = Result<(), Signal>;

/// Non-local outcome of an operation
///
/// Everything except `Error` is an internal signal: it never reaches the
/// host unless it escapes the context it is legal in.
#[derive(Debug)]
pub enum Signal {
    Break,
    TailCall(Rc<Lambda>),
    Error(RuntimeError),
    Await(Pending),
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Error(err)
    }
}

/// Future result of an awaited external operation
pub type PendingFuture = Pin<Box<dyn Future<Output = Result<Option<Value>, RuntimeError>>>>;

/// An outstanding external operation: the driver awaits `future` and
/// resumes the evaluator with its output, or runs `cancel` if the run is
/// cancelled first.
pub struct Pending {
    pub label: String,
    pub future: PendingFuture,
    pub cancel: Option<Box<dyn FnOnce()>>,
}

impl Pending {
    pub fn new(
        label: impl Into<String>,
        future: impl Future<Output = Result<Option<Value>, RuntimeError>> + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            future: Box::pin(future),
            cancel: None,
        }
    }

    pub fn on_cancel(mut self, cancel: impl FnOnce() + 'static) -> Self {
        self.cancel = Some(Box::new(cancel));
        self
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("label", &self.label)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Control flow state
///
/// When control != None, the evaluator unwinds the frame stack to find the
/// handler for it. `Suspend` stops stepping until the driver resumes.
#[derive(Debug, Clone)]
pub enum Control {
    None,
    Break,
    TailCall(Rc<Lambda>),
    Throw(LocatedError),
    Suspend,
}

/* ===================== Frames ===================== */

/// Iteration source for `for` / `fori`
#[derive(Debug, Clone)]
pub enum ForSource {
    Range { start: i64, end: i64 },
    Items(Rc<Vec<Value>>),
    Chars(Rc<[char]>),
}

impl ForSource {
    pub fn len(&self) -> usize {
        match self {
            ForSource::Range { start, end } => {
                let span = (i128::from(*end) - i128::from(*start)).max(0);
                usize::try_from(span).unwrap_or(usize::MAX)
            }
            ForSource::Items(items) => items.len(),
            ForSource::Chars(chars) => chars.len(),
        }
    }

    /// Element at `index` (the value itself for ranges)
    pub fn element(&self, index: usize) -> Value {
        match self {
            // index < len, so the sum stays inside start..end
            ForSource::Range { start, .. } => Value::Int(start.wrapping_add(index as i64)),
            ForSource::Items(items) => items[index].clone(),
            ForSource::Chars(chars) => Value::Str(Rc::from(chars[index].to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondPhase {
    /// Run the condition of pair `index`
    Test,
    /// Inspect the boolean it left behind
    Check,
}

/// Execution frame
///
/// The frame stack replaces the host call stack, so every nested quotation
/// is stepped one element at a time and execution can stop at any token.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Top-level token sequence
    Program { tokens: Rc<[Token]>, pc: usize },
    /// Running quotation contents
    Body { code: Rc<Vec<Value>>, pc: usize },
    /// Closure activation; finishes the call once its body frame is gone
    Call { lam: Rc<Lambda>, floor: usize },
    Loop { body: Rc<Vec<Value>> },
    For {
        source: ForSource,
        index: usize,
        with_index: bool,
        body: Rc<Vec<Value>>,
    },
    Cond {
        pairs: Rc<Vec<(Value, Value)>>,
        index: usize,
        phase: CondPhase,
    },
    /// Protected region opened by `try`; `height` is the stack height to
    /// restore when an error is caught
    Try { height: usize },
    /// Write-back of a datadef updater once its quotation has run; the
    /// quotation sees only the field value above `floor`
    Update {
        instance: Rc<Vec<Value>>,
        slot: FieldSlot,
        scope: Rc<Scope>,
        floor: usize,
    },
}

impl Frame {
    pub fn body(code: Rc<Vec<Value>>) -> Self {
        Frame::Body { code, pc: 0 }
    }
}
