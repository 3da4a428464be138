//! Type definitions for the evaluator
//!
//! - Tokens and origins (input)
//! - Runtime values, parameter lists and datadef operations
//! - Control signals and execution frames

pub mod control;
pub mod datatype;
pub mod params;
pub mod token;
pub mod values;

pub use control::{CondPhase, Control, ForSource, Frame, OpResult, Pending, Signal};
pub use datatype::{DataOp, FieldSlot, FIELD_BASE, STRUCT_TAG};
pub use params::{Param, Params};
pub use token::{Bracket, Origin, Token, TokenKind};
pub use values::{Lambda, Marker, OpRef, Operation, Reference, Value, RECUR};
