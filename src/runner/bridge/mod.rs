//! Concrete evaluation bridge.
//!
//! Operators applied to fully concrete scalars are not re-derived by the
//! analyzer. At setup every supported operator is registered as a tiny named
//! function with a [`ReferenceEvaluator`], and at call time the operands are
//! marshalled into [`TaggedValue`]s, the function is invoked by name and the
//! result is brought back into the lattice.

pub mod js_engine;

use std::collections::HashMap;
use std::fmt;

use log::{error, info, trace};
use thiserror::Error;

use crate::parser::ast::{BinaryOperator, UnaryOperator};
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::operations::type_conversion::{
    number_to_js_string, TYPE_STR_NULL, TYPE_STR_UNDEFINED,
};
use crate::runner::ds::value::{AbstractValue, PrimitiveValue};

pub use js_engine::BoaEvaluator;

/// Unary operators evaluated through the bridge.
pub const BRIDGED_UNARY_OPERATORS: &[UnaryOperator] = &[
    UnaryOperator::Plus,
    UnaryOperator::Minus,
    UnaryOperator::LogicalNot,
    UnaryOperator::BitwiseNot,
];

/// Binary operators evaluated through the bridge.
pub const BRIDGED_BINARY_OPERATORS: &[BinaryOperator] = &[
    BinaryOperator::Add,
    BinaryOperator::Subtract,
    BinaryOperator::Multiply,
    BinaryOperator::Divide,
    BinaryOperator::Modulo,
    BinaryOperator::GreaterThan,
    BinaryOperator::LessThan,
    BinaryOperator::GreaterThanEqual,
    BinaryOperator::LessThanEqual,
    BinaryOperator::LooselyEqual,
    BinaryOperator::LooselyUnequal,
    BinaryOperator::StrictlyEqual,
    BinaryOperator::StrictlyUnequal,
    BinaryOperator::BitwiseXor,
    BinaryOperator::BitwiseOr,
    BinaryOperator::BitwiseAnd,
    BinaryOperator::BitwiseLeftShift,
    BinaryOperator::BitwiseRightShift,
    BinaryOperator::BitwiseUnsignedRightShift,
];

/// Scalar exchanged with the reference evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Undefined,
    Null,
}

impl TaggedValue {
    /// `None` for anything that is not a concrete scalar.
    pub fn from_abstract(v: &AbstractValue) -> Option<TaggedValue> {
        Some(match v {
            AbstractValue::Primitive(PrimitiveValue::Number(n)) => TaggedValue::Number(*n),
            AbstractValue::Primitive(PrimitiveValue::String(s)) => TaggedValue::String(s.clone()),
            AbstractValue::Primitive(PrimitiveValue::Boolean(b)) => TaggedValue::Boolean(*b),
            AbstractValue::Undefined => TaggedValue::Undefined,
            AbstractValue::Null => TaggedValue::Null,
            _ => return None,
        })
    }

    pub fn into_abstract(self) -> AbstractValue {
        match self {
            TaggedValue::Number(n) => AbstractValue::number(n),
            TaggedValue::String(s) => AbstractValue::string(s),
            TaggedValue::Boolean(b) => AbstractValue::boolean(b),
            TaggedValue::Undefined => AbstractValue::Undefined,
            TaggedValue::Null => AbstractValue::Null,
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            TaggedValue::Number(n) => number_to_js_string(*n),
            TaggedValue::String(s) => s.clone(),
            TaggedValue::Boolean(b) => b.to_string(),
            TaggedValue::Undefined => TYPE_STR_UNDEFINED.to_string(),
            TaggedValue::Null => TYPE_STR_NULL.to_string(),
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedValue::String(s) => write!(f, "{:?}", s),
            other => f.write_str(&other.to_js_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("reference evaluator unavailable: {0}")]
    Unavailable(String),
    #[error("could not register `{name}`: {reason}")]
    Registration { name: String, reason: String },
    #[error("no function named `{0}` is registered")]
    UnknownFunction(String),
    #[error("`{name}` expects {expected} arguments, got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("evaluating `{name}` failed: {reason}")]
    Evaluation { name: String, reason: String },
}

/// A real JavaScript engine, or anything that answers like one for scalar operators.
pub trait ReferenceEvaluator {
    fn initialize(&mut self) -> Result<(), BridgeError>;

    /// Compiles `source`, a function declaration named `name`, and keeps it for
    /// [`invoke`](Self::invoke).
    fn register(&mut self, name: &str, source: &str) -> Result<(), BridgeError>;

    fn invoke(&self, name: &str, args: &[TaggedValue]) -> Result<TaggedValue, BridgeError>;

    /// Gives back a value returned by [`invoke`](Self::invoke) once it has been copied out.
    fn release(&self, _value: TaggedValue) {}

    fn name(&self) -> &str;
}

pub struct ConcreteBridge {
    evaluator: Box<dyn ReferenceEvaluator>,
    unary: HashMap<UnaryOperator, String>,
    binary: HashMap<BinaryOperator, String>,
}

impl ConcreteBridge {
    /// Initializes the evaluator and registers one snippet per operator. Any failure is fatal.
    pub fn new(mut evaluator: Box<dyn ReferenceEvaluator>) -> Result<Self, AnalysisError> {
        evaluator.initialize().map_err(setup_error)?;
        let mut unary = HashMap::new();
        for (i, op) in BRIDGED_UNARY_OPERATORS.iter().enumerate() {
            let name = format!("unop_{}", i);
            let source = format!("function {}(a) {{ return {} a }}", name, op);
            evaluator.register(&name, &source).map_err(setup_error)?;
            unary.insert(*op, name);
        }
        let mut binary = HashMap::new();
        for (i, op) in BRIDGED_BINARY_OPERATORS.iter().enumerate() {
            let name = format!("binop_{}", i);
            let source = format!("function {}(a, b) {{ return a {} b }}", name, op);
            evaluator.register(&name, &source).map_err(setup_error)?;
            binary.insert(*op, name);
        }
        info!(
            "concrete evaluation bridge ready: {} operators registered with `{}`",
            unary.len() + binary.len(),
            evaluator.name()
        );
        Ok(ConcreteBridge {
            evaluator,
            unary,
            binary,
        })
    }

    pub fn evaluator_name(&self) -> &str {
        self.evaluator.name()
    }

    pub fn supports_unary(&self, op: UnaryOperator) -> bool {
        self.unary.contains_key(&op)
    }

    pub fn supports_binary(&self, op: BinaryOperator) -> bool {
        self.binary.contains_key(&op)
    }

    /// Exact result of `op arg`. A non-concrete operand is a caller defect.
    pub fn unary(
        &self,
        op: UnaryOperator,
        arg: &AbstractValue,
    ) -> Result<AbstractValue, AnalysisError> {
        let name = self
            .unary
            .get(&op)
            .ok_or_else(|| AnalysisError::defect("concrete bridge", op.as_str(), arg))?;
        self.call(name, op.as_str(), &[arg])
    }

    /// Exact result of `a op b`. A non-concrete operand is a caller defect.
    pub fn binary(
        &self,
        op: BinaryOperator,
        a: &AbstractValue,
        b: &AbstractValue,
    ) -> Result<AbstractValue, AnalysisError> {
        let name = self
            .binary
            .get(&op)
            .ok_or_else(|| AnalysisError::defect("concrete bridge", op.as_str(), a))?;
        self.call(name, op.as_str(), &[a, b])
    }

    fn call(
        &self,
        name: &str,
        operator: &str,
        args: &[&AbstractValue],
    ) -> Result<AbstractValue, AnalysisError> {
        let mut tagged = Vec::with_capacity(args.len());
        for arg in args {
            match TaggedValue::from_abstract(arg) {
                Some(t) => tagged.push(t),
                None => {
                    error!("bridge received non-concrete operand {} for `{}`", arg, operator);
                    return Err(AnalysisError::defect("concrete bridge", operator, arg));
                }
            }
        }
        let result = self.evaluator.invoke(name, &tagged).map_err(|e| {
            error!("bridge call `{}` failed: {}", name, e);
            AnalysisError::Defect {
                context: "concrete bridge".to_string(),
                operator: operator.to_string(),
                value: e.to_string(),
            }
        })?;
        trace!("bridge {}({:?}) = {}", operator, tagged, result);
        let value = result.clone().into_abstract();
        self.evaluator.release(result);
        Ok(value)
    }
}

fn setup_error(e: BridgeError) -> AnalysisError {
    AnalysisError::Setup(format!("concrete evaluation bridge: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshalling_rejects_non_scalars() {
        assert_eq!(
            TaggedValue::from_abstract(&AbstractValue::number(1.5)),
            Some(TaggedValue::Number(1.5))
        );
        assert_eq!(TaggedValue::from_abstract(&AbstractValue::Null), Some(TaggedValue::Null));
        assert_eq!(TaggedValue::from_abstract(&AbstractValue::Top), None);
        assert_eq!(
            TaggedValue::from_abstract(&AbstractValue::Reference(
                crate::runner::ds::value::ObjectId(0)
            )),
            None
        );
    }

    #[test]
    fn test_tagged_conversions() {
        assert_eq!(TaggedValue::Number(1e21).to_js_string(), "1e+21");
        assert_eq!(TaggedValue::Null.to_js_string(), "null");
        assert_eq!(TaggedValue::String("a".to_string()).to_string(), "\"a\"");
    }
}
