//! Stack-language evaluator
//!
//! ## Architecture
//! - `vm`: evaluator state, token and value execution, closure entry
//! - `exec_loop`: one-checkpoint stepping over an explicit frame stack
//! - `driver`: async host API (runs, cancellation, awaited operations)
//! - `stack` / `scope`: operand stack with floors, active-scope bindings
//! - `binder`: parameter binding and return checks
//! - `registry` / `stdlib`: the builtin operator set
//! - `reporter`: sink for assertion outcomes

pub mod binder;
pub mod driver;
pub mod errors;
pub mod exec_loop;
pub mod registry;
pub mod reporter;
pub mod scope;
pub mod stack;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

pub use driver::{Outcome, Progress, Run};
pub use errors::{LocatedError, RuntimeError};
pub use exec_loop::{run_until_done, step, Step};
pub use registry::{Builtin, Registry};
pub use reporter::{AssertionKind, StatsReporter, TestReporter};
pub use scope::{Scope, ScopeStack};
pub use stack::OperandStack;
pub use types::{Origin, Pending, Token, TokenKind, Value};
pub use vm::{Evaluator, Limits};
