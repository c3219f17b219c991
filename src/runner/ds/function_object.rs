use std::rc::Rc;

use crate::parser::ast::FunctionData;
use crate::runner::ds::env_record::ScopeId;

/// Index into the registry's table of native built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId(pub usize);

/// A function written in the analyzed program, closed over its defining scope.
#[derive(Debug, Clone)]
pub struct FunctionObject {
    pub code: Rc<FunctionData>,
    /// Text of the program the function was parsed from; `code.meta` indexes into it.
    pub source: Rc<str>,
    pub scope: ScopeId,
}

impl FunctionObject {
    pub fn new(code: Rc<FunctionData>, source: Rc<str>, scope: ScopeId) -> Self {
        FunctionObject {
            code,
            source,
            scope,
        }
    }

    /// Exact source slice of the function, which is what `Function.prototype.toString` yields.
    pub fn source_text(&self) -> &str {
        self.code.meta.source_text(&self.source)
    }

    pub fn name(&self) -> &str {
        self.code.id.as_ref().map(|id| id.name.as_str()).unwrap_or("")
    }
}
