//! Assertion operators and the test reporter

use std::cell::RefCell;
use std::rc::Rc;

use super::helpers::run_on;
use crate::interpreter::exec_loop::Step;
use crate::interpreter::reporter::{AssertionKind, StatsReporter};
use crate::interpreter::types::{Origin, Value};
use crate::interpreter::vm::Evaluator;

#[test]
fn test_assertions_report_outcomes() {
    let reporter = Rc::new(RefCell::new(StatsReporter::new()));
    let mut ev = Evaluator::new().with_reporter(reporter.clone());

    let source = "1 1 assert-eq\n\
                  1 2 assert-eq\n\
                  0.1 0.2 + 0.3 assert-approx\n\
                  1 1.5 assert-not-approx\n\
                  \"a\" \"b\" assert-ne";
    assert_eq!(run_on(&mut ev, source), Step::Done);

    let reporter = reporter.borrow();
    assert_eq!(reporter.passed, 4);
    assert_eq!(reporter.failed(), 1);

    let failure = &reporter.failures[0];
    assert_eq!(failure.kind, AssertionKind::Equals);
    assert_eq!(failure.operands, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(failure.origin, Origin::new(2, 5));
}

#[test]
fn test_assertions_without_reporter_do_not_fail() {
    let mut ev = Evaluator::new();
    assert_eq!(run_on(&mut ev, "1 2 assert-eq 3"), Step::Done);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(3)]);
}

#[test]
fn test_approx_requires_numbers() {
    let mut ev = Evaluator::new();
    match run_on(&mut ev, r#""a" 1 assert-approx"#) {
        Step::Failed(err) => {
            assert_eq!(err.message(), r#"`assert-approx` expects Num, got Str "a""#)
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
