//! Core types for the evaluation engine.

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::value::AbstractValue;

pub type ValueResult = Result<AbstractValue, AnalysisError>;

pub type CompletionResult = Result<Completion, AnalysisError>;

/// How a statement finished.
///
/// Branches are explored together, so a statement may return on some paths
/// and fall through on others.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Execution continues with the next statement.
    Normal,
    /// Every path returned.
    Return(AbstractValue),
    /// Some paths returned this value, the others fell through.
    MaybeReturn(AbstractValue),
}

impl Completion {
    pub fn is_normal(&self) -> bool {
        matches!(self, Completion::Normal)
    }

    /// Completion of a statement whose two branches finished as `self` and `other`.
    pub fn join(self, other: Completion) -> Completion {
        match (self, other) {
            (Completion::Normal, Completion::Normal) => Completion::Normal,
            (Completion::Return(a), Completion::Return(b)) => Completion::Return(a.join(b)),
            (Completion::Normal, Completion::Return(v))
            | (Completion::Return(v), Completion::Normal)
            | (Completion::Normal, Completion::MaybeReturn(v))
            | (Completion::MaybeReturn(v), Completion::Normal) => Completion::MaybeReturn(v),
            (Completion::Return(a), Completion::MaybeReturn(b))
            | (Completion::MaybeReturn(a), Completion::Return(b))
            | (Completion::MaybeReturn(a), Completion::MaybeReturn(b)) => {
                Completion::MaybeReturn(a.join(b))
            }
        }
    }

    /// Sequencing: `self` finished earlier and some paths may already have returned.
    pub fn then(self, next: Completion) -> Completion {
        match (self, next) {
            (Completion::Normal, next) => next,
            (Completion::MaybeReturn(a), Completion::Normal) => Completion::MaybeReturn(a),
            (Completion::MaybeReturn(a), Completion::Return(b)) => Completion::Return(a.join(b)),
            (Completion::MaybeReturn(a), Completion::MaybeReturn(b)) => {
                Completion::MaybeReturn(a.join(b))
            }
            (Completion::Return(a), _) => Completion::Return(a),
        }
    }
}
