//! Runtime error taxonomy
//!
//! Every failure surfaces as a `LocatedError`: a `RuntimeError` plus the
//! origin of the token that was executing (best effort when ambiguous).
//! The same value is the payload of `Value::Err`.

use std::fmt;
use thiserror::Error;

use super::types::Origin;

pub const STACK_EMPTY: &str = "stack is empty";
pub const STACK_OUT_OF_RANGE: &str = "stack access is out of range";
pub const BREAK_OUTSIDE_LOOP: &str = "operator can only be used in a loop";
pub const TAILCALL_OUTSIDE_FUNCTION: &str = "tailcall can only be used in a function";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("stack is empty")]
    StackEmpty,

    #[error("stack access is out of range")]
    StackOutOfRange,

    #[error("unknown reference `{name}`")]
    UnknownReference { name: String },

    #[error("{message}")]
    TypeMismatch { message: String },

    #[error("{message}")]
    Arity { message: String },

    #[error("{message}")]
    ControlFlowMisuse { message: String },

    #[error("{message}")]
    DefinitionConflict { message: String },

    #[error("{message}")]
    Unbalanced { message: String },

    #[error("{message}")]
    Arithmetic { message: String },

    #[error("{message}")]
    UserRaised { message: String },
}

impl RuntimeError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn arity(message: impl Into<String>) -> Self {
        RuntimeError::Arity {
            message: message.into(),
        }
    }

    pub fn control_flow(message: impl Into<String>) -> Self {
        RuntimeError::ControlFlowMisuse {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        RuntimeError::DefinitionConflict {
            message: message.into(),
        }
    }

    pub fn unknown_type(name: &str) -> Self {
        RuntimeError::TypeMismatch {
            message: format!("unknown type `{}`", name),
        }
    }

    /// Attach an origin, producing the user-visible error value
    pub fn at(self, origin: Origin) -> LocatedError {
        LocatedError {
            error: self,
            origin: Some(origin),
        }
    }
}

/// A raised failure: message-bearing error plus the token that raised it
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedError {
    pub error: RuntimeError,
    pub origin: Option<Origin>,
}

impl LocatedError {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Some(origin) => write!(f, "{} (at {})", self.error, origin),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for LocatedError {}

impl From<RuntimeError> for LocatedError {
    fn from(error: RuntimeError) -> Self {
        LocatedError {
            error,
            origin: None,
        }
    }
}
