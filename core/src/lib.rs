pub mod cli;
pub mod config;
pub mod interpreter;
pub mod lexer;

// Re-export main types
pub use config::Config;
pub use interpreter::{Evaluator, Outcome, Value};
pub use lexer::{tokenize, LexError};
