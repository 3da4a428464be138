//! Evaluator tests
//!
//! Organized by feature area

mod closure_tests;
mod control_tests;
mod driver_tests;
mod error_tests;
mod helpers;
mod reporter_tests;
