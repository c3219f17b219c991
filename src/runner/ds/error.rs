use thiserror::Error;

use crate::parser::Rule;
use crate::runner::ds::value::AbstractValue;

/// Failures that abort an analysis run. Imprecision is never an error: it is `Top`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A value shape reached code that has no modeled handling for it.
    #[error("implementation defect in {context}: `{operator}` received {value}")]
    Defect {
        context: String,
        operator: String,
        value: String,
    },
    /// `___assert` saw a value that is not definitely truthy.
    #[error("analyzer assertion failed: `{expression}` evaluated to {value}")]
    AssertionFailed { expression: String, value: String },
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("evaluation nested deeper than {depth} levels")]
    RecursionLimit { depth: usize },
}

impl AnalysisError {
    pub fn defect(
        context: impl Into<String>,
        operator: impl Into<String>,
        value: &AbstractValue,
    ) -> Self {
        AnalysisError::Defect {
            context: context.into(),
            operator: operator.into(),
            value: value.to_string(),
        }
    }
}

impl From<pest::error::Error<Rule>> for AnalysisError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        AnalysisError::Parse {
            message: e.to_string(),
        }
    }
}
