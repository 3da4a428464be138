//! fun, lam, cond-fun, parameter binding, floors and tail calls

use super::helpers::{error_of, ints, run_on, run_source, stack_of, tokens};
use crate::interpreter::errors::{STACK_OUT_OF_RANGE, TAILCALL_OUTSIDE_FUNCTION};
use crate::interpreter::exec_loop::{step, Step};
use crate::interpreter::types::Value;
use crate::interpreter::vm::{Evaluator, Limits};

#[test]
fn test_named_function() {
    assert_eq!(
        stack_of("double: (x :Num -> :Num) { x 2 * } fun 21 double"),
        ints(&[42])
    );
}

#[test]
fn test_last_parameter_takes_top_operand() {
    assert_eq!(stack_of("10 3 (a b) { a b - } lam call"), ints(&[7]));
}

#[test]
fn test_lam_captures_scope() {
    assert_eq!(stack_of("5 x: def { x 1 + } lam call"), ints(&[6]));
}

#[test]
fn test_capture_is_a_snapshot() {
    assert_eq!(
        stack_of("10 k: def add-k: (x) { x k + } fun 20 k: def 1 add-k"),
        ints(&[11])
    );
}

#[test]
fn test_bindings_do_not_leak_out_of_calls() {
    let err = error_of("f: (x) { x } fun 1 f x");
    assert_eq!(err.message(), "unknown reference `x`");
}

#[test]
fn test_recursion_by_recur_and_by_name() {
    assert_eq!(
        stack_of("fact: (n) { n 1 <= { 1 } { n n 1 - recur * } if } fun 5 fact"),
        ints(&[120])
    );
    assert_eq!(
        stack_of("fact: (n) { n 1 <= { 1 } { n n 1 - fact * } if } fun 6 fact"),
        ints(&[720])
    );
}

#[test]
fn test_nested_calls_release_floors() {
    let (ev, step) =
        run_source("inner: (a) { a 1 + } fun outer: (a) { a inner 2 * } fun 3 outer");
    assert_eq!(step, Step::Done);
    assert_eq!(ev.stack.to_vec(), ints(&[8]));
    assert_eq!(ev.stack.floor_count(), 0);
    assert_eq!(ev.scopes.depth(), 0);
}

#[test]
fn test_floor_hides_caller_operands() {
    assert_eq!(stack_of("f: { depth } fun 1 2 f"), ints(&[1, 2, 0]));

    let (ev, step) = run_source("f: { pop } fun 1 f");
    match step {
        Step::Failed(err) => assert_eq!(err.message(), STACK_OUT_OF_RANGE),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(ev.stack.floor_count(), 0);
    assert_eq!(ev.stack.to_vec(), ints(&[1]));
}

#[test]
fn test_arity_error() {
    let err = error_of("f: (a b) { a } fun 1 f");
    assert_eq!(err.message(), "expected 2 arguments but only 1 is available");
}

#[test]
fn test_parameter_type_mismatch() {
    let err = error_of(r#"f: (x :Int) { x } fun "a" f"#);
    assert_eq!(err.message(), r#"parameter `x` expects Int, got Str "a""#);
}

#[test]
fn test_unknown_parameter_type() {
    let err = error_of("f: (x :Widget) { x } fun 1 f");
    assert_eq!(err.message(), "unknown type `Widget`");
}

#[test]
fn test_nil_is_not_any() {
    let err = error_of("f: (x :Any) { x } fun nil f");
    assert_eq!(err.message(), "parameter `x` expects Any, got Nil nil");
}

#[test]
fn test_return_checks() {
    assert_eq!(
        error_of("f: (-> :Int) { 1 2 } fun f").message(),
        "expected 1 return value but 2 were left on the stack"
    );
    assert_eq!(
        error_of("f: (-> :Int :Int) { 1 } fun f").message(),
        "expected 2 return values but only 1 was produced"
    );
    assert_eq!(
        error_of(r#"f: (-> :Int) { "s" } fun f"#).message(),
        r#"return value 1 expects Int, got Str "s""#
    );
    assert_eq!(stack_of("f: (-> :Int :Str) { 1 \"a\" } fun f").len(), 2);
}

#[test]
fn test_arrays_built_inside_function_bodies() {
    assert_eq!(
        stack_of("pair: (x, y) { [x y] } fun 1 2 pair"),
        vec![Value::array(ints(&[1, 2]))]
    );
    assert_eq!(
        stack_of("wrap: (x) { [[x] x] } fun 5 wrap"),
        vec![Value::array(vec![Value::array(ints(&[5])), Value::Int(5)])]
    );
    assert_eq!(
        stack_of("{ [1 2 +] } call"),
        vec![Value::array(ints(&[3]))]
    );
}

#[test]
fn test_array_in_quotation_is_built_per_run() {
    let stack = stack_of("(x) { [x] } lam n: def 1 n 2 n");
    assert_eq!(
        stack,
        vec![Value::array(ints(&[1])), Value::array(ints(&[2]))]
    );
}

#[test]
fn test_failed_binding_releases_scope() {
    let (ev, step) = run_source(r#"f: (x :Int) { x } fun { "a" f } try err?"#);
    assert_eq!(step, Step::Done);
    assert_eq!(ev.stack.to_vec(), vec![Value::Bool(true)]);
    assert_eq!(ev.scopes.depth(), 0);
    assert_eq!(ev.stack.floor_count(), 0);
}

#[test]
fn test_cond_fun() {
    assert_eq!(
        stack_of(
            "sign: (n) [ { n 0 < } { -1 } { n 0 = } { 0 } { true } { 1 } ] cond-fun \
             -5 sign 0 sign 7 sign"
        ),
        ints(&[-1, 0, 1])
    );
}

#[test]
fn test_builtin_names_are_reserved() {
    assert_eq!(
        error_of("1 dup: def").message(),
        "cannot redefine builtin `dup`"
    );
    assert_eq!(
        error_of("if: { } fun").message(),
        "cannot redefine builtin `if`"
    );
}

#[test]
fn test_self_tail_call_runs_in_constant_space() {
    let mut ev = Evaluator::new();
    ev.load(tokens(
        r#"count: (n) { n 0 = { "done" } { n 1 - 'recur tailcall } if } fun 100000 count"#,
    ));

    let mut max_floors = 0;
    let mut max_frames = 0;
    loop {
        match step(&mut ev) {
            Step::Checkpoint => {
                max_floors = max_floors.max(ev.stack.floor_count());
                max_frames = max_frames.max(ev.frames.len());
            }
            Step::Done => break,
            other => panic!("unexpected {:?}", other),
        }
    }

    assert_eq!(ev.stack.to_vec(), vec![Value::str("done")]);
    assert_eq!(max_floors, 1);
    assert!(max_frames <= 4, "frame stack grew to {}", max_frames);
    assert_eq!(ev.stack.floor_count(), 0);
}

#[test]
fn test_tail_call_to_another_closure() {
    let (ev, step) =
        run_source("twice: (n) { n 2 * } fun start: (n) { n 1 + 'twice tailcall } fun 4 start");
    assert_eq!(step, Step::Done);
    assert_eq!(ev.stack.to_vec(), ints(&[10]));
    assert_eq!(ev.stack.floor_count(), 0);
    assert_eq!(ev.scopes.depth(), 0);
}

#[test]
fn test_tail_call_from_inside_loop() {
    assert_eq!(
        stack_of("done: { 99 } fun f: { { 'done tailcall } loop } fun f"),
        ints(&[99])
    );
}

#[test]
fn test_tailcall_outside_function() {
    assert_eq!(
        error_of("{ } lam tailcall").message(),
        TAILCALL_OUTSIDE_FUNCTION
    );
}

#[test]
fn test_frame_limit() {
    let mut ev = Evaluator::new().with_limits(Limits {
        max_frames: 50,
        trace_checkpoints: false,
    });
    match run_on(&mut ev, "f: { f } fun f") {
        Step::Failed(err) => assert_eq!(err.message(), "call depth limit exceeded"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(ev.stack.floor_count(), 0);
    assert_eq!(ev.scopes.depth(), 0);
}
