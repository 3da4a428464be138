//! Test helpers for evaluator tests
//!
//! Tokenize source, run it synchronously and inspect the stack

use crate::interpreter::errors::LocatedError;
use crate::interpreter::exec_loop::{run_until_done, Step};
use crate::interpreter::types::{Token, Value};
use crate::interpreter::vm::Evaluator;
use crate::lexer;

pub fn tokens(source: &str) -> Vec<Token> {
    lexer::tokenize(source).expect("tokenize failed")
}

/// Run `source` on an existing evaluator until it completes or fails
pub fn run_on(ev: &mut Evaluator, source: &str) -> Step {
    ev.load(tokens(source));
    run_until_done(ev)
}

/// Run `source` on a fresh evaluator
pub fn run_source(source: &str) -> (Evaluator, Step) {
    let mut ev = Evaluator::new();
    let step = run_on(&mut ev, source);
    (ev, step)
}

/// Run `source` and return the final stack, panicking on failure
pub fn stack_of(source: &str) -> Vec<Value> {
    let (ev, step) = run_source(source);
    assert_eq!(step, Step::Done, "run of {:?} did not complete", source);
    ev.stack.to_vec()
}

/// Run `source` and return the error it fails with
pub fn error_of(source: &str) -> LocatedError {
    match run_source(source).1 {
        Step::Failed(error) => error,
        other => panic!("expected {:?} to fail, got {:?}", source, other),
    }
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int(*v)).collect()
}
