//! Operand stack with protected floors
//!
//! A floor is a height below which the current activation may not pop or
//! peek. Floors are released by value rather than strictly LIFO, so a tail
//! call can re-establish a floor at the same height as the one it replaces.

use super::errors::RuntimeError;
use super::types::Value;

#[derive(Debug, Clone, Default)]
pub struct OperandStack {
    items: Vec<Value>,
    floors: Vec<usize>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Active floor (0 when no floor is set)
    pub fn floor(&self) -> usize {
        self.floors.last().copied().unwrap_or(0)
    }

    /// Number of floors currently held
    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    /// Height above the active floor
    pub fn accessible_count(&self) -> usize {
        self.items.len().saturating_sub(self.floor())
    }

    /// Absolute height
    pub fn count(&self) -> usize {
        self.items.len()
    }

    fn access_error(&self) -> RuntimeError {
        if self.items.is_empty() {
            RuntimeError::StackEmpty
        } else {
            RuntimeError::StackOutOfRange
        }
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.items.len() <= self.floor() {
            return Err(self.access_error());
        }
        self.items.pop().ok_or(RuntimeError::StackEmpty)
    }

    /// Value `offset` places below the top (0 = top)
    pub fn peek(&self, offset: usize) -> Result<&Value, RuntimeError> {
        if offset >= self.accessible_count() {
            return Err(self.access_error());
        }
        Ok(&self.items[self.items.len() - 1 - offset])
    }

    /// Pop values until one matches `pred`.
    ///
    /// The matching value is discarded; the values above it are returned in
    /// their original (bottom-to-top) order. Returns `None` without touching
    /// the stack when no accessible value matches.
    pub fn pop_until<F>(&mut self, pred: F) -> Option<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let floor = self.floor();
        let idx = self.items[floor..].iter().rposition(pred)? + floor;
        let collected = self.items.split_off(idx + 1);
        self.items.pop();
        Some(collected)
    }

    /// Accessible values from `height` up, bottom first
    pub fn values_from(&self, height: usize) -> &[Value] {
        &self.items[height.min(self.items.len())..]
    }

    /// Drop accessible values above `height`
    pub fn truncate(&mut self, height: usize) {
        self.items.truncate(height.max(self.floor()));
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.floors.clear();
    }

    /// Protect everything currently on the stack; returns the new floor
    pub fn forbid_pop(&mut self) -> usize {
        let height = self.items.len();
        self.floors.push(height);
        height
    }

    /// Release one floor at `height`
    pub fn allow_pop(&mut self, height: usize) {
        if let Some(pos) = self.floors.iter().rposition(|h| *h == height) {
            self.floors.remove(pos);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.clone()
    }
}
