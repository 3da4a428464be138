//! Test-reporting collaborator
//!
//! Assertion operators never fail a run on their own; they hand every
//! outcome to the injected reporter, which decides what to record.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use super::types::{Origin, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionKind {
    Equals,
    NotEquals,
    ApproxEquals,
    NotApproxEquals,
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssertionKind::Equals => "equals",
            AssertionKind::NotEquals => "not-equals",
            AssertionKind::ApproxEquals => "approx-equals",
            AssertionKind::NotApproxEquals => "not-approx-equals",
        };
        f.write_str(name)
    }
}

/// Sink for assertion outcomes
pub trait TestReporter {
    fn report(&mut self, passed: bool, kind: AssertionKind, operands: &[Value], origin: Origin);

    fn show_stats(&self);
}

/// A recorded assertion failure
#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: AssertionKind,
    pub operands: Vec<Value>,
    pub origin: Origin,
}

/// Reporter that counts outcomes and keeps the failures
#[derive(Debug, Default)]
pub struct StatsReporter {
    pub passed: usize,
    pub failures: Vec<Failure>,
}

impl StatsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.passed + self.failures.len()
    }
}

impl TestReporter for StatsReporter {
    fn report(&mut self, passed: bool, kind: AssertionKind, operands: &[Value], origin: Origin) {
        if passed {
            self.passed += 1;
            return;
        }
        let rendered: Vec<String> = operands.iter().map(|v| v.to_string()).collect();
        warn!(%kind, %origin, operands = ?rendered, "assertion failed");
        self.failures.push(Failure {
            kind,
            operands: operands.to_vec(),
            origin,
        });
    }

    fn show_stats(&self) {
        info!(
            total = self.total(),
            passed = self.passed,
            failed = self.failed(),
            "assertion summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_passes_and_keeps_failures() {
        let mut reporter = StatsReporter::new();
        reporter.report(
            true,
            AssertionKind::Equals,
            &[Value::Int(1), Value::Int(1)],
            Origin::new(1, 1),
        );
        reporter.report(
            false,
            AssertionKind::NotEquals,
            &[Value::Int(2), Value::Int(2)],
            Origin::new(2, 5),
        );

        assert_eq!(reporter.passed, 1);
        assert_eq!(reporter.failed(), 1);
        assert_eq!(reporter.failures[0].kind, AssertionKind::NotEquals);
        assert_eq!(reporter.failures[0].origin, Origin::new(2, 5));
    }

    #[test]
    fn kind_display_uses_kebab_names() {
        assert_eq!(AssertionKind::NotApproxEquals.to_string(), "not-approx-equals");
    }
}
