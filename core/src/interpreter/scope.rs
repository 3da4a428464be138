//! Scope stack
//!
//! Only the active scope is visible. Closures do not chain into enclosing
//! scopes; they carry a detached snapshot that is swapped in wholesale when
//! they run.

use std::collections::HashMap;
use std::rc::Rc;

use super::types::Value;

/// A single naming scope
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: HashMap<Rc<str>, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Insert or replace a binding, returning the previous value
    pub fn insert(&mut self, name: impl Into<Rc<str>>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Rc<str>, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (Rc<str>, Value)>>(iter: I) -> Self {
        Scope {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Active scope plus the scopes it displaced
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    active: Scope,
    saved: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind in the active scope only, replacing any prior binding
    pub fn put(&mut self, name: impl Into<Rc<str>>, value: Value) {
        self.active.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.active.get(name)
    }

    pub fn active(&self) -> &Scope {
        &self.active
    }

    /// Make `scope` active, saving the current one
    pub fn push_scope(&mut self, scope: Scope) {
        let previous = std::mem::replace(&mut self.active, scope);
        self.saved.push(previous);
    }

    /// Restore the previously active scope, returning the one removed
    pub fn pop_scope(&mut self) -> Scope {
        let restored = self.saved.pop().unwrap_or_default();
        std::mem::replace(&mut self.active, restored)
    }

    /// Detached snapshot of the active scope
    pub fn copy_scope(&self) -> Scope {
        self.active.clone()
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn clear(&mut self) {
        self.active = Scope::default();
        self.saved.clear();
    }
}
