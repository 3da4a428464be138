//! Async driving: stepping, awaited operations and cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::helpers::tokens;
use crate::interpreter::driver::{Outcome, Progress};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::registry::Registry;
use crate::interpreter::types::{Pending, Signal, Value};
use crate::interpreter::vm::Evaluator;

/// Registry whose `wait` operation never completes and records its cancellation
fn registry_with_wait(cancelled: Arc<AtomicBool>) -> Registry {
    let mut registry = Registry::standard();
    registry.register("wait", move |_ev| {
        let flag = cancelled.clone();
        let pending = Pending::new(
            "wait",
            std::future::pending::<Result<Option<Value>, RuntimeError>>(),
        )
        .on_cancel(move || flag.store(true, Ordering::SeqCst));
        Err(Signal::Await(pending))
    });
    registry.register("fetch", |_ev| {
        Err(Signal::Await(Pending::new("fetch", async {
            Ok(Some(Value::str("payload")))
        })))
    });
    registry.register("explode", |_ev| {
        Err(Signal::Await(Pending::new("explode", async {
            Err(RuntimeError::UserRaised {
                message: "remote failure".to_string(),
            })
        })))
    });
    registry
}

#[tokio::test]
async fn test_run_to_completion() {
    let mut ev = Evaluator::new();
    let outcome = ev.run(tokens("1 2 +")).await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(3)]);
}

#[tokio::test]
async fn test_step_advances_one_checkpoint() {
    let mut ev = Evaluator::new();
    let mut run = ev.start(tokens("{ 1 2 } call"));

    let mut checkpoints = 0;
    let outcome = loop {
        match run.step().await {
            Progress::Checkpoint => checkpoints += 1,
            Progress::Resumed => panic!("nothing to await"),
            Progress::Settled(outcome) => break outcome,
        }
    };
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(checkpoints, 7);

    // Settled runs keep reporting their outcome
    assert_eq!(run.step().await, Progress::Settled(Outcome::Completed));
}

#[tokio::test]
async fn test_start_value_runs_a_single_value() {
    let mut ev = Evaluator::new();
    let body = Value::quote(vec![Value::Int(4), Value::Int(5)]);
    let outcome = ev.start_value(body).finish().await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(
        ev.stack.to_vec(),
        vec![Value::quote(vec![Value::Int(4), Value::Int(5)])]
    );
}

#[tokio::test]
async fn test_sleep_suspends_and_resumes() {
    let mut ev = Evaluator::new();
    let outcome = ev.run(tokens("1 5 sleep 2")).await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(1), Value::Int(2)]);
}

#[tokio::test]
async fn test_awaited_value_is_pushed() {
    let mut ev = Evaluator::with_registry(Arc::new(registry_with_wait(Arc::default())));
    let mut run = ev.start(tokens("fetch len"));

    assert_eq!(run.step().await, Progress::Checkpoint);
    assert_eq!(run.step().await, Progress::Resumed);
    assert_eq!(run.finish().await, Outcome::Completed);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(7)]);
}

#[tokio::test]
async fn test_awaited_failure_fails_the_run() {
    let mut ev = Evaluator::with_registry(Arc::new(registry_with_wait(Arc::default())));
    match ev.run(tokens("explode")).await {
        Outcome::Failed(err) => assert_eq!(err.message(), "remote failure"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!ev.is_running());
}

#[tokio::test]
async fn test_awaited_failure_is_caught_by_try() {
    let mut ev = Evaluator::with_registry(Arc::new(registry_with_wait(Arc::default())));
    let outcome = ev.run(tokens("1 { 2 explode 3 } try dup err? swap err-msg")).await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(
        ev.stack.to_vec(),
        vec![Value::Int(1), Value::Bool(true), Value::str("remote failure")]
    );
    assert!(!ev.is_running());
}

#[tokio::test]
async fn test_awaited_failure_inside_function_is_caught() {
    let mut ev = Evaluator::with_registry(Arc::new(registry_with_wait(Arc::default())));
    let outcome = ev
        .run(tokens("boom: { explode } fun { boom } try err? 5"))
        .await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(ev.stack.to_vec(), vec![Value::Bool(true), Value::Int(5)]);
    assert_eq!(ev.stack.accessible_count(), 2);
}

#[tokio::test]
async fn test_cancel_while_waiting_runs_cancel_action() {
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut ev = Evaluator::with_registry(Arc::new(registry_with_wait(cancelled.clone())));
    let mut run = ev.start(tokens("1 wait 2"));
    let handle = run.cancel_handle();

    assert_eq!(run.step().await, Progress::Checkpoint);
    assert_eq!(run.step().await, Progress::Checkpoint);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    assert_eq!(run.step().await, Progress::Settled(Outcome::Cancelled));
    assert_eq!(run.step().await, Progress::Settled(Outcome::Cancelled));
    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(run.interrupted(), Some("wait"));

    drop(run);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(1)]);
    assert!(!ev.is_running());
}

#[tokio::test]
async fn test_cancel_during_sleep() {
    let mut ev = Evaluator::new();
    let mut run = ev.start(tokens("7 60000 sleep 8"));
    let handle = run.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    assert_eq!(run.step().await, Progress::Checkpoint);
    assert_eq!(run.step().await, Progress::Checkpoint);
    assert_eq!(run.step().await, Progress::Checkpoint);
    assert_eq!(run.interrupted(), None);

    let settled = tokio::time::timeout(Duration::from_secs(5), run.step())
        .await
        .expect("cancelled sleep should settle promptly");
    assert_eq!(settled, Progress::Settled(Outcome::Cancelled));
    assert_eq!(run.interrupted(), Some("sleep"));

    drop(run);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(7)]);
    assert!(!ev.is_running());
}

#[tokio::test]
async fn test_cancel_interrupts_busy_loop() {
    let mut ev = Evaluator::new();
    let run = ev.start(tokens("{ } loop"));
    let handle = run.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), run.finish())
        .await
        .expect("busy loop should observe cancellation");
    assert_eq!(outcome, Outcome::Cancelled);
    assert!(ev.checkpoints() > 0);
}

#[tokio::test]
async fn test_cancel_before_first_step() {
    let mut ev = Evaluator::new();
    let mut run = ev.start(tokens("1 2 3"));
    run.cancel_handle().cancel();
    assert_eq!(run.step().await, Progress::Settled(Outcome::Cancelled));
    drop(run);
    assert_eq!(ev.checkpoints(), 0);
    assert_eq!(ev.stack.count(), 0);
}

#[tokio::test]
async fn test_copies_run_independently() {
    let mut base = Evaluator::new();
    assert_eq!(base.run(tokens("[1] xs: def")).await, Outcome::Completed);

    let mut left = base.copy();
    let mut right = base.copy();
    let (a, b) = tokio::join!(
        left.run(tokens("xs 2 append 5 sleep xs: def")),
        right.run(tokens("xs 3 append 1 sleep xs: def")),
    );
    assert_eq!(a, Outcome::Completed);
    assert_eq!(b, Outcome::Completed);

    assert_eq!(base.scopes.get("xs"), Some(&Value::array(vec![Value::Int(1)])));
    assert_eq!(
        left.scopes.get("xs"),
        Some(&Value::array(vec![Value::Int(1), Value::Int(2)]))
    );
    assert_eq!(
        right.scopes.get("xs"),
        Some(&Value::array(vec![Value::Int(1), Value::Int(3)]))
    );
}

#[test]
fn test_blocking_on_a_run() {
    let mut ev = Evaluator::new();
    let outcome = tokio_test::block_on(ev.run(tokens("2 3 *")));
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(ev.stack.to_vec(), vec![Value::Int(6)]);
}
