//! Builtin registry
//!
//! Built once, then shared read-only (`Arc`) by every evaluator created from
//! it. Builtins always win name lookup over user bindings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::stdlib;
use super::types::OpResult;
use super::vm::Evaluator;

/// Native operation body
pub type BuiltinFn = Arc<dyn Fn(&mut Evaluator) -> OpResult + Send + Sync>;

/// A named native operation
#[derive(Clone)]
pub struct Builtin {
    pub name: Arc<str>,
    pub func: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, ev: &mut Evaluator) -> OpResult {
        (self.func)(ev)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

#[derive(Default, Clone)]
pub struct Registry {
    ops: HashMap<Arc<str>, Builtin>,
}

impl Registry {
    /// Empty registry (no operators at all)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard operator set installed
    pub fn standard() -> Self {
        let mut registry = Self::new();
        stdlib::install(&mut registry);
        registry
    }

    /// Register (or re-register) an operation under `name`
    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut Evaluator) -> OpResult + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(name);
        self.ops.insert(
            name.clone(),
            Builtin {
                name,
                func: Arc::new(func),
            },
        );
    }

    /// Register a table of plain function operations
    pub fn register_all(&mut self, ops: &[(&str, fn(&mut Evaluator) -> OpResult)]) {
        for (name, func) in ops {
            self.register(name, *func);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("ops", &self.ops.len()).finish()
    }
}
