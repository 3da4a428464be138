//! Tokenizer - PEST-based scanner for cinder source text
//!
//! Produces the flat token sequence the evaluator consumes. The evaluator
//! never looks at characters; everything it needs is in `TokenKind`.

use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::interpreter::types::{Bracket, Origin, Token, TokenKind};


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "lexer/tokens.pest"]
struct TokenParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Error)]
pub enum LexError {
    #[error("{0}")]
    Pest(String),
    #[error("invalid number `{text}` at {origin}")]
    Number { text: String, origin: Origin },
}

impl From<pest::error::Error<Rule>> for LexError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        LexError::Pest(err.to_string())
    }
}

pub type LexResult<T> = Result<T, LexError>;

/* ===================== Public API ===================== */

/// Split source text into tokens
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    let mut pairs = TokenParser::parse(Rule::program, source)?;
    let Some(program) = pairs.next() else {
        return Ok(Vec::new());
    };

    let mut tokens = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        let (line, column) = pair.line_col();
        let origin = Origin::new(line, column);
        let text = pair.as_str();

        let kind = match pair.as_rule() {
            Rule::int => TokenKind::Int(text.parse().map_err(|_| LexError::Number {
                text: text.to_string(),
                origin,
            })?),
            Rule::float => TokenKind::Flt(text.parse().map_err(|_| LexError::Number {
                text: text.to_string(),
                origin,
            })?),
            Rule::string => {
                let inner = pair
                    .into_inner()
                    .next()
                    .map(|p| p.as_str())
                    .unwrap_or_default();
                TokenKind::Str(unescape(inner))
            }
            Rule::boolean => TokenKind::Bool(text == "true"),
            Rule::nil => TokenKind::Nil,
            Rule::arrow => TokenKind::Arrow,
            Rule::open_array => TokenKind::Open(Bracket::Array),
            Rule::close_array => TokenKind::Close(Bracket::Array),
            Rule::open_quote => TokenKind::Open(Bracket::Quote),
            Rule::close_quote => TokenKind::Close(Bracket::Quote),
            Rule::open_params => TokenKind::Open(Bracket::Params),
            Rule::close_params => TokenKind::Close(Bracket::Params),
            Rule::symbol => TokenKind::Sym(text[1..].to_string()),
            Rule::type_name => TokenKind::Type(text[1..].to_string()),
            Rule::definition => TokenKind::Define(text[..text.len() - 1].to_string()),
            _ => TokenKind::Name(text.to_string()),
        };
        tokens.push(Token::new(kind, origin));
    }

    Ok(tokens)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
