//! # jsai - abstract interpretation of JavaScript
//!
//! Evaluates scripts over an abstract value lattice so that whatever can be
//! computed statically (string decoding chains, `eval` payloads, constant
//! arithmetic) comes out as a concrete value, and everything else is `Top`.
//! Typical input is obfuscated code; typical output is the deobfuscated
//! payload and the final state of the program's globals.
//!
//! ## Quick Start
//!
//! ```
//! use jsai::runner::api::Analyzer;
//! use jsai::runner::ds::value::AbstractValue;
//! use jsai::runner::plugin::config::AnalysisConfig;
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
//! let outcome = analyzer
//!     .analyze("var s = String.fromCharCode(104, 105); var n = Math.random();")
//!     .unwrap();
//! assert_eq!(outcome.global("s"), Some(&AbstractValue::string("hi")));
//! assert_eq!(outcome.global("n"), Some(&AbstractValue::Top));
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG parser and AST types for the supported subset
//! - **[`runner`]** - The analysis itself
//!   - **[`runner::ds`]** - Lattice values, abstract objects, the object store and coercions
//!   - **[`runner::bridge`]** - Exact scalar operators through a reference evaluator
//!   - **[`runner::eval`]** - Abstract evaluation of expressions and statements
//!   - **[`runner::plugin`]** - Built-in registry, method hooks and configuration
//!   - **[`runner::std_lib`]** - Abstract built-ins
//!   - **[`runner::api`]** - The [`runner::api::Analyzer`] entry point

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;
