//! if, cond, loops and break

use super::helpers::{error_of, ints, stack_of};
use crate::interpreter::errors::BREAK_OUTSIDE_LOOP;
use crate::interpreter::types::Value;

#[test]
fn test_if_with_else() {
    assert_eq!(stack_of(r#"true { "a" } { "b" } if"#), vec![Value::str("a")]);
    assert_eq!(stack_of(r#"false { "a" } { "b" } if"#), vec![Value::str("b")]);
}

#[test]
fn test_if_without_else() {
    assert_eq!(stack_of("1 true { 1 + } if"), ints(&[2]));
    assert_eq!(stack_of("1 false { 1 + } if"), ints(&[1]));
}

#[test]
fn test_if_requires_bool() {
    let err = error_of("1 { 2 } if");
    assert_eq!(err.message(), "`if` expects Bool, got Int 1");
}

#[test]
fn test_cond_first_true_wins() {
    let program = |n: i64| {
        format!(
            r#"{} n: def [ {{ n 0 < }} {{ "neg" }} {{ n 0 = }} {{ "zero" }} {{ true }} {{ "pos" }} ] cond"#,
            n
        )
    };
    assert_eq!(stack_of(&program(-4)), vec![Value::str("neg")]);
    assert_eq!(stack_of(&program(0)), vec![Value::str("zero")]);
    assert_eq!(stack_of(&program(9)), vec![Value::str("pos")]);
}

#[test]
fn test_cond_without_match_pushes_nothing() {
    assert_eq!(stack_of(r#"[ { false } { "x" } ] cond"#), Vec::<Value>::new());
}

#[test]
fn test_cond_non_bool_condition() {
    let err = error_of(r#"[ { 1 } { "x" } ] cond"#);
    assert!(err.message().starts_with("cond condition must produce Bool"));
}

#[test]
fn test_cond_odd_pairs_rejected() {
    let err = error_of("[ { true } ] cond");
    assert!(err.message().contains("condition/action pairs"));
}

#[test]
fn test_loop_until_breakif() {
    assert_eq!(stack_of("0 { 1 + dup 5 = breakif } loop"), ints(&[5]));
}

#[test]
fn test_nested_loop_break_is_local() {
    assert_eq!(
        stack_of("0 { { break } loop 1 + dup 3 = breakif } loop"),
        ints(&[3])
    );
}

#[test]
fn test_for_over_range() {
    assert_eq!(stack_of("0 0 5 { + } for"), ints(&[10]));
    assert_eq!(stack_of("3 3 { } for"), Vec::<Value>::new());
}

#[test]
fn test_for_over_range_wider_than_i64() {
    assert_eq!(
        stack_of("-9000000000000000000 9000000000000000000 { break } for"),
        vec![Value::Int(-9_000_000_000_000_000_000)]
    );
    assert_eq!(
        stack_of("9223372036854775806 9223372036854775807 { } for"),
        vec![Value::Int(i64::MAX - 1)]
    );
    assert_eq!(
        stack_of("9000000000000000000 -9000000000000000000 { } for"),
        Vec::<Value>::new()
    );
}

#[test]
fn test_fori_pushes_element_then_index() {
    assert_eq!(stack_of("[10 20] { } fori"), ints(&[10, 0, 20, 1]));
    assert_eq!(stack_of("5 7 { } fori"), ints(&[5, 0, 6, 1]));
}

#[test]
fn test_for_over_string_characters() {
    assert_eq!(
        stack_of(r#""ab" { } for"#),
        vec![Value::str("a"), Value::str("b")]
    );
}

#[test]
fn test_for_break() {
    assert_eq!(
        stack_of("0 10 { dup 3 = breakif pop } for"),
        ints(&[3])
    );
}

#[test]
fn test_for_rejects_non_iterable() {
    let err = error_of("true { } for");
    assert_eq!(
        err.message(),
        "`for` expects a range, array or string, got Bool true"
    );
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(error_of("break").message(), BREAK_OUTSIDE_LOOP);
    assert_eq!(error_of("true breakif").message(), BREAK_OUTSIDE_LOOP);
}

#[test]
fn test_break_does_not_cross_closure() {
    let err = error_of("f: { break } fun { f } loop");
    assert_eq!(err.message(), BREAK_OUTSIDE_LOOP);
}

#[test]
fn test_break_inside_quotation_in_loop() {
    assert_eq!(stack_of("{ 1 { break } call } loop"), ints(&[1]));
}
