//! Abstract evaluation of the JavaScript AST.
//!
//! Every expression evaluates to an `AbstractValue`; statements thread an
//! `AnalysisState` through and fork it wherever control flow is not known.

pub mod expression;
pub mod function;
pub mod operators;
pub mod statement;
pub mod types;

pub use types::{Completion, CompletionResult, ValueResult};
