//! Token types consumed by the evaluator
//!
//! Tokens are produced by the lexer (or any other front end) and are opaque
//! to the evaluator apart from their category and source position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position of a token (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Origin {
    pub line: usize,
    pub column: usize,
}

impl Origin {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Structural bracket families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bracket {
    /// `[ ... ]` array
    Array,
    /// `{ ... }` quotation
    Quote,
    /// `( ... )` parameter list
    Params,
}

/// Token category and literal payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum TokenKind {
    Int(i64),
    Flt(f64),
    Str(String),
    Bool(bool),
    Nil,
    /// `'name` symbol literal
    Sym(String),
    /// `Name:` definition marker
    Define(String),
    /// `:Type` annotation
    Type(String),
    Open(Bracket),
    Close(Bracket),
    /// `->` separating parameters from return types
    Arrow,
    Name(String),
}

/// A single token with its source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub origin: Origin,
}

impl Token {
    pub fn new(kind: TokenKind, origin: Origin) -> Self {
        Self { kind, origin }
    }

    /// Token without a meaningful position (host-constructed programs)
    pub fn bare(kind: TokenKind) -> Self {
        Self {
            kind,
            origin: Origin::default(),
        }
    }
}
