//! Evaluator state
//!
//! The evaluator holds everything a run touches:
//! - the shared builtin registry (read-only)
//! - the operand stack and scope stack
//! - the frame stack and pending control signal
//! - nesting counters for open quotations and parameter lists
//!
//! Stepping lives in `exec_loop`; this module covers construction, token and
//! value execution, and closure entry.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use super::binder;
use super::errors::{LocatedError, RuntimeError};
use super::registry::Registry;
use super::reporter::TestReporter;
use super::scope::ScopeStack;
use super::stack::OperandStack;
use super::stdlib::datadef;
use super::types::{
    Bracket, Control, Frame, Lambda, Marker, OpRef, OpResult, Operation, Origin, Params, Pending,
    Reference, Signal, Token, TokenKind, Value,
};
use crate::config::Config;

/* ===================== Limits ===================== */

/// Per-evaluator runtime limits taken from `Config`
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_frames: usize,
    pub trace_checkpoints: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frames: 100_000,
            trace_checkpoints: false,
        }
    }
}

impl From<&Config> for Limits {
    fn from(config: &Config) -> Self {
        Self {
            max_frames: config.limits.max_frames,
            trace_checkpoints: config.trace.checkpoints,
        }
    }
}

/* ===================== Evaluator ===================== */

pub struct Evaluator {
    registry: Arc<Registry>,
    pub stack: OperandStack,
    pub scopes: ScopeStack,
    pub(crate) frames: Vec<Frame>,
    pub(crate) control: Control,
    pub(crate) pending: Option<Pending>,
    quote_depth: usize,
    params_depth: usize,
    /// Origin of the most recently executed token (best-effort diagnostics)
    pub(crate) origin: Origin,
    pub(crate) limits: Limits,
    pub(crate) checkpoints: u64,
    reporter: Option<Rc<RefCell<dyn TestReporter>>>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Evaluator over the standard operator set
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::standard()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            stack: OperandStack::new(),
            scopes: ScopeStack::new(),
            frames: Vec::new(),
            control: Control::None,
            pending: None,
            quote_depth: 0,
            params_depth: 0,
            origin: Origin::default(),
            limits: Limits::default(),
            checkpoints: 0,
            reporter: None,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_reporter(mut self, reporter: Rc<RefCell<dyn TestReporter>>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn reporter(&self) -> Option<&Rc<RefCell<dyn TestReporter>>> {
        self.reporter.as_ref()
    }

    /// Number of checkpoints executed since creation or the last reset
    pub fn checkpoints(&self) -> u64 {
        self.checkpoints
    }

    /// True while a run is in progress (frames left or suspended)
    pub fn is_running(&self) -> bool {
        !self.frames.is_empty() || self.pending.is_some()
    }

    /// Clear stack, scope, frames and nesting counters
    pub fn reset(&mut self) {
        self.stack.clear();
        self.scopes.clear();
        self.frames.clear();
        self.control = Control::None;
        self.pending = None;
        self.quote_depth = 0;
        self.params_depth = 0;
        self.checkpoints = 0;
    }

    /// Independent evaluator sharing only the registry.
    ///
    /// Stack and scope are shallow copies: bindings are duplicated, the
    /// values they hold are shared until written (copy-on-write).
    pub fn copy(&self) -> Evaluator {
        Evaluator {
            registry: self.registry.clone(),
            stack: self.stack.clone(),
            scopes: self.scopes.clone(),
            frames: Vec::new(),
            control: Control::None,
            pending: None,
            quote_depth: 0,
            params_depth: 0,
            origin: self.origin,
            limits: self.limits,
            checkpoints: 0,
            reporter: self.reporter.clone(),
        }
    }

    /* ===================== Run Setup ===================== */

    /// Queue a token sequence as the root frame of a new run
    pub fn load(&mut self, tokens: Vec<Token>) {
        self.frames.clear();
        self.control = Control::None;
        self.frames.push(Frame::Program {
            tokens: tokens.into(),
            pc: 0,
        });
    }

    /// Queue a single value (executed as if it were one token)
    pub fn load_value(&mut self, value: Value) {
        self.frames.clear();
        self.control = Control::None;
        self.frames.push(Frame::body(Rc::new(vec![value])));
    }

    /// Resume after a pending external operation completed
    pub fn resume(&mut self, result: Option<Value>) {
        if let Some(value) = result {
            self.stack.push(value);
        }
        self.control = Control::None;
    }

    pub(crate) fn take_pending(&mut self) -> Option<Pending> {
        self.pending.take()
    }

    /* ===================== Definitions ===================== */

    /// Bind a name in the active scope; builtin names are reserved
    pub fn define(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if self.registry.contains(name) {
            return Err(RuntimeError::conflict(format!(
                "cannot redefine builtin `{}`",
                name
            )));
        }
        debug!(name, kind = value.type_name(), "define");
        self.scopes.put(name, value);
        Ok(())
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /* ===================== Token Execution ===================== */

    pub(crate) fn execute_token(&mut self, token: &Token) -> OpResult {
        self.origin = token.origin;
        match &token.kind {
            TokenKind::Int(v) => self.execute(Value::Int(*v)),
            TokenKind::Flt(v) => self.execute(Value::Flt(*v)),
            TokenKind::Str(s) => self.execute(Value::str(s)),
            TokenKind::Bool(b) => self.execute(Value::Bool(*b)),
            TokenKind::Nil => self.execute(Value::Nil),
            TokenKind::Sym(s) | TokenKind::Define(s) | TokenKind::Type(s) => {
                self.execute(Value::sym(s))
            }
            TokenKind::Arrow => {
                self.stack.push(Value::Marker(Marker::Arrow));
                Ok(())
            }
            TokenKind::Open(bracket) => {
                let marker = match bracket {
                    Bracket::Array => Marker::ArrayOpen,
                    Bracket::Quote => {
                        self.quote_depth += 1;
                        Marker::QuoteOpen
                    }
                    Bracket::Params => {
                        self.params_depth += 1;
                        Marker::ParamsOpen
                    }
                };
                self.stack.push(Value::Marker(marker));
                Ok(())
            }
            TokenKind::Close(Bracket::Array) if self.quote_depth > 0 => {
                self.stack.push(Value::Marker(Marker::ArrayClose));
                Ok(())
            }
            TokenKind::Close(bracket) => self.close(*bracket),
            TokenKind::Name(name) => self.execute_name(name, token.origin),
        }
    }

    fn close(&mut self, bracket: Bracket) -> OpResult {
        let (marker, label) = match bracket {
            Bracket::Array => (Marker::ArrayOpen, "]"),
            Bracket::Quote => (Marker::QuoteOpen, "}"),
            Bracket::Params => (Marker::ParamsOpen, ")"),
        };
        let items = self
            .stack
            .pop_until(|v| matches!(v, Value::Marker(m) if *m == marker))
            .ok_or_else(|| RuntimeError::Unbalanced {
                message: format!("unmatched `{}`", label),
            })?;

        let value = match bracket {
            Bracket::Array => Value::array(items),
            Bracket::Quote => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                Value::quote(items)
            }
            Bracket::Params => {
                self.params_depth = self.params_depth.saturating_sub(1);
                Value::Params(Rc::new(Params::from_items(items)?))
            }
        };
        self.stack.push(value);
        Ok(())
    }

    /// True while tokens are being collected as inert content
    pub fn is_collecting(&self) -> bool {
        self.quote_depth > 0 || self.params_depth > 0
    }

    pub(crate) fn open_containers(&self) -> usize {
        self.quote_depth + self.params_depth
    }

    pub(crate) fn reset_collecting(&mut self) {
        self.quote_depth = 0;
        self.params_depth = 0;
    }

    fn execute_name(&mut self, name: &str, origin: Origin) -> OpResult {
        if self.is_collecting() {
            let deferred = match self.registry.get(name) {
                Some(builtin) => Value::Op(OpRef {
                    op: Operation::Builtin(builtin.clone()),
                    origin,
                }),
                None => Value::Ref(Rc::new(Reference {
                    name: Rc::from(name),
                    origin,
                })),
            };
            self.stack.push(deferred);
            return Ok(());
        }
        self.resolve_and_invoke(name)
    }

    fn resolve_and_invoke(&mut self, name: &str) -> OpResult {
        if let Some(builtin) = self.registry.get(name) {
            let builtin = builtin.clone();
            return builtin.call(self);
        }
        match self.scopes.get(name) {
            Some(value) => {
                let value = value.clone();
                self.invoke_resolved(value)
            }
            None => Err(Signal::Error(RuntimeError::UnknownReference {
                name: name.to_string(),
            })),
        }
    }

    /* ===================== Value Execution ===================== */

    /// Execute a value as program content.
    ///
    /// Literals, containers and closures push themselves; references resolve
    /// and run; operations run.
    pub fn execute(&mut self, value: Value) -> OpResult {
        match value {
            Value::Marker(Marker::ArrayClose) => self.close(Bracket::Array),
            Value::Ref(reference) => {
                self.origin = reference.origin;
                self.resolve_and_invoke(&reference.name)
            }
            Value::Op(op_ref) => {
                self.origin = op_ref.origin;
                self.invoke_op(&op_ref.op)
            }
            Value::Int(_)
            | Value::Flt(_)
            | Value::Bool(_)
            | Value::Str(_)
            | Value::Sym(_)
            | Value::Nil
            | Value::Arr(_)
            | Value::ExeArr(_)
            | Value::Lam(_)
            | Value::Params(_)
            | Value::Marker(_)
            | Value::Err(_) => {
                self.stack.push(value);
                Ok(())
            }
        }
    }

    /// Run a value that a name resolved to
    fn invoke_resolved(&mut self, value: Value) -> OpResult {
        match value {
            Value::Lam(lam) => self.call_lambda(lam),
            Value::Op(op_ref) => self.invoke_op(&op_ref.op),
            other => {
                self.stack.push(other);
                Ok(())
            }
        }
    }

    fn invoke_op(&mut self, op: &Operation) -> OpResult {
        match op {
            Operation::Builtin(builtin) => builtin.call(self),
            Operation::Data(data) => datadef::invoke(self, data),
        }
    }

    /// Explicitly invoke a quotation, closure or operation
    pub fn invoke(&mut self, callable: Value) -> OpResult {
        match callable {
            Value::ExeArr(code) => self.push_frame(Frame::body(code)),
            Value::Lam(lam) => self.call_lambda(lam),
            Value::Op(op_ref) => self.invoke_op(&op_ref.op),
            other => Err(Signal::Error(RuntimeError::type_mismatch(format!(
                "cannot invoke {} {}",
                other.type_name(),
                other
            )))),
        }
    }

    /* ===================== Frames ===================== */

    pub(crate) fn push_frame(&mut self, frame: Frame) -> OpResult {
        if self.frames.len() >= self.limits.max_frames {
            return Err(Signal::Error(RuntimeError::control_flow(
                "call depth limit exceeded",
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Enter a closure: swap in the closure's scope, bind parameters from
    /// the caller's operands and isolate the stack above them.
    pub fn call_lambda(&mut self, lam: Rc<Lambda>) -> OpResult {
        if self.frames.len() + 2 > self.limits.max_frames {
            return Err(Signal::Error(RuntimeError::control_flow(
                "call depth limit exceeded",
            )));
        }
        self.scopes.push_scope(lam.activation_scope());
        if let Some(params) = &lam.params {
            if let Err(error) = binder::bind(self, params) {
                self.scopes.pop_scope();
                return Err(error.into());
            }
        }

        let floor = self.stack.forbid_pop();
        let body = lam.body.clone();
        self.frames.push(Frame::Call { lam, floor });
        self.frames.push(Frame::body(body));
        Ok(())
    }

    /// Replace the activation owning the Call frame at `idx` with `target`,
    /// reusing its floor.
    ///
    /// The new scope replaces the old one before binding, so an error leaves
    /// the Call frame owning exactly one scope for the unwinder to release.
    pub(crate) fn replace_activation(
        &mut self,
        idx: usize,
        target: Rc<Lambda>,
    ) -> Result<(), RuntimeError> {
        while self.frames.len() > idx + 1 {
            if let Some(frame) = self.frames.pop() {
                self.release(&frame);
            }
        }

        self.scopes.pop_scope();
        self.scopes.push_scope(target.activation_scope());
        if let Some(params) = &target.params {
            binder::bind(self, params)?;
        }

        let body = target.body.clone();
        if let Some(Frame::Call { lam, .. }) = self.frames.get_mut(idx) {
            *lam = target;
        }
        self.frames.push(Frame::body(body));
        Ok(())
    }

    /// Give back what a frame being unwound holds: a closure's scope and
    /// floor, or an updater's floor.
    pub(crate) fn release(&mut self, frame: &Frame) {
        match frame {
            Frame::Call { floor, .. } => {
                self.scopes.pop_scope();
                self.stack.allow_pop(*floor);
            }
            Frame::Update { floor, .. } => self.stack.allow_pop(*floor),
            _ => {}
        }
    }

    /// Fail the suspended operation: the error is raised at the token that
    /// suspended, so an enclosing `try` can still catch it.
    pub(crate) fn fail_pending(&mut self, error: RuntimeError) {
        let located = self.locate(error);
        self.control = Control::Throw(located);
    }

    /// Locate a raised error at the current origin
    pub(crate) fn locate(&self, error: RuntimeError) -> LocatedError {
        error.at(self.origin)
    }
}
