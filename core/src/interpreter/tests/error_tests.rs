//! Error taxonomy, origins and `try`

use super::helpers::{error_of, ints, run_source, stack_of};
use crate::interpreter::errors::{RuntimeError, STACK_EMPTY};
use crate::interpreter::exec_loop::Step;
use crate::interpreter::types::{Origin, Value};

#[test]
fn test_second_pop_fails_with_empty_stack() {
    let err = error_of("42 pop pop");
    assert_eq!(err.message(), STACK_EMPTY);
    assert_eq!(err.error, RuntimeError::StackEmpty);
    assert_eq!(err.origin, Some(Origin::new(1, 8)));
}

#[test]
fn test_unknown_reference_has_origin() {
    let err = error_of("1\n  foo");
    assert_eq!(err.message(), "unknown reference `foo`");
    assert_eq!(err.origin, Some(Origin::new(2, 3)));
    assert_eq!(err.to_string(), "unknown reference `foo` (at 2:3)");
}

#[test]
fn test_unknown_reference_inside_quotation_reports_use_site() {
    let err = error_of("{ 1 missing } call");
    assert_eq!(err.origin, Some(Origin::new(1, 5)));
}

#[test]
fn test_unbalanced_brackets() {
    assert_eq!(error_of("1 ]").message(), "unmatched `]`");
    assert_eq!(
        error_of("{ 1 2").message(),
        "unclosed quotation or parameter list"
    );
}

#[test]
fn test_user_raised_error() {
    let err = error_of(r#""boom" error"#);
    assert_eq!(
        err.error,
        RuntimeError::UserRaised {
            message: "boom".to_string()
        }
    );
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(error_of("1 0 /").message(), "division by zero");
    assert_eq!(
        error_of("9223372036854775807 1 +").message(),
        "integer overflow in `+`"
    );
    assert_eq!(
        error_of(r#"1 "a" +"#).message(),
        r#"`+` expects Num, got Str "a""#
    );
}

#[test]
fn test_invoking_non_callable() {
    assert_eq!(error_of("5 call").message(), "`call` expects a quotation, got Int 5");
}

#[test]
fn test_try_recovers_with_error_value() {
    assert_eq!(
        stack_of(r#"1 { 2 "boom" error } try err-msg"#),
        vec![Value::Int(1), Value::str("boom")]
    );
}

#[test]
fn test_try_success_keeps_results() {
    assert_eq!(stack_of("{ 1 2 } try"), ints(&[1, 2]));
}

#[test]
fn test_try_unwinds_closures() {
    let (ev, step) = run_source(r#"f: (a) { "deep" error } fun 7 8 { f } try err?"#);
    assert_eq!(step, Step::Done);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(7), Value::Bool(true)]);
    assert_eq!(ev.stack.floor_count(), 0);
    assert_eq!(ev.scopes.depth(), 0);
}

#[test]
fn test_failure_releases_activations() {
    let (ev, step) = run_source(r#"f: (a) { a "inner" error } fun 1 f"#);
    assert!(matches!(step, Step::Failed(_)));
    assert_eq!(ev.stack.floor_count(), 0);
    assert_eq!(ev.scopes.depth(), 0);
    assert!(!ev.is_running());
}
