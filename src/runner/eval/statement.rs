//! Statement execution and the program entry point.
//!
//! A test whose truthiness is unknown runs both branches on separate forks of
//! the state and continues with their join. Blocks do not open scopes: `let`
//! and `const` bind in the enclosing function or program scope.

use log::{debug, trace};

use crate::parser::ast::{
    DeclarationType, ExpressionType, ProgramData, StatementType, VariableDeclarationData,
    VariableDeclarationKind,
};
use crate::runner::ds::env_record::ScopeId;
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::operations::type_conversion::known_truthiness;
use crate::runner::ds::value::AbstractValue;
use crate::runner::plugin::types::EvalContext;

use super::expression::evaluate_expression;
use super::types::{Completion, CompletionResult, ValueResult};

/// Runs a program in the current scope and returns the value of its last
/// expression statement, which is also left in `state.value`.
pub fn run_program(ctx: &mut EvalContext, program: &ProgramData) -> ValueResult {
    trace!("[{}] running {} statements", ctx.run_id, program.body.len());
    ctx.state.value = AbstractValue::Undefined;
    let scope = ctx.scope;
    hoist_declarations(ctx, &program.body, scope)?;
    let completion = execute_statements(ctx, &program.body)?;
    if !completion.is_normal() {
        debug!("[{}] `return` outside of a function ignored", ctx.run_id);
    }
    Ok(ctx.state.value.clone())
}

/// Binds function declarations and `var` names of `body` in `scope` before it runs.
pub fn hoist_declarations(
    ctx: &mut EvalContext,
    body: &[StatementType],
    scope: ScopeId,
) -> Result<(), AnalysisError> {
    for stmt in body {
        match stmt {
            StatementType::DeclarationStatement(DeclarationType::FunctionDeclaration(f)) => {
                let name = match &f.id {
                    Some(id) => id.name.clone(),
                    None => continue,
                };
                let function = FunctionObject::new(f.clone(), ctx.source.clone(), scope);
                let id = ctx.allocate(AbstractObject::new_function(function))?;
                ctx.state
                    .scopes
                    .declare(scope, &name, AbstractValue::Reference(id));
            }
            StatementType::DeclarationStatement(DeclarationType::VariableDeclaration(v))
                if v.kind == VariableDeclarationKind::Var =>
            {
                for declarator in &v.declarations {
                    if !ctx.state.scopes.has_own_binding(scope, &declarator.id.name) {
                        ctx.state
                            .scopes
                            .declare(scope, &declarator.id.name, AbstractValue::Undefined);
                    }
                }
            }
            StatementType::BlockStatement { body, .. } => hoist_declarations(ctx, body, scope)?,
            StatementType::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                hoist_declarations(ctx, std::slice::from_ref(consequent.as_ref()), scope)?;
                if let Some(alternate) = alternate {
                    hoist_declarations(ctx, std::slice::from_ref(alternate.as_ref()), scope)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn execute_statements(ctx: &mut EvalContext, body: &[StatementType]) -> CompletionResult {
    let mut completion = Completion::Normal;
    for stmt in body {
        completion = completion.then(execute_statement(ctx, stmt)?);
        if let Completion::Return(_) = completion {
            break;
        }
    }
    Ok(completion)
}

pub fn execute_statement(ctx: &mut EvalContext, stmt: &StatementType) -> CompletionResult {
    match stmt {
        StatementType::ExpressionStatement { expression, .. } => {
            let value = evaluate_expression(ctx, expression)?;
            ctx.state.value = value;
            Ok(Completion::Normal)
        }
        StatementType::BlockStatement { body, .. } => execute_statements(ctx, body),
        StatementType::EmptyStatement { .. } => Ok(Completion::Normal),
        StatementType::ReturnStatement { argument, .. } => {
            let value = match argument {
                Some(argument) => evaluate_expression(ctx, argument)?,
                None => AbstractValue::Undefined,
            };
            Ok(Completion::Return(value))
        }
        StatementType::IfStatement {
            test,
            consequent,
            alternate,
            ..
        } => execute_if(ctx, test, consequent, alternate.as_deref()),
        StatementType::DeclarationStatement(DeclarationType::FunctionDeclaration(_)) => {
            Ok(Completion::Normal)
        }
        StatementType::DeclarationStatement(DeclarationType::VariableDeclaration(v)) => {
            execute_variable_declaration(ctx, v)?;
            Ok(Completion::Normal)
        }
    }
}

fn execute_if(
    ctx: &mut EvalContext,
    test: &ExpressionType,
    consequent: &StatementType,
    alternate: Option<&StatementType>,
) -> CompletionResult {
    let condition = evaluate_expression(ctx, test)?;
    match known_truthiness(ctx, &condition)? {
        Some(true) => execute_statement(ctx, consequent),
        Some(false) => match alternate {
            Some(alternate) => execute_statement(ctx, alternate),
            None => Ok(Completion::Normal),
        },
        None => {
            trace!("unknown `if` test {}, running both branches", condition);
            let before = ctx.state.clone();
            let first = execute_statement(ctx, consequent)?;
            let second_state = before.fork_after(&ctx.state);
            let first_state = std::mem::replace(&mut ctx.state, second_state);
            let second = match alternate {
                Some(alternate) => execute_statement(ctx, alternate)?,
                None => Completion::Normal,
            };
            let second_state = std::mem::take(&mut ctx.state);
            ctx.state = first_state.join(second_state, ctx.max_union_size());
            Ok(first.join(second))
        }
    }
}

fn execute_variable_declaration(
    ctx: &mut EvalContext,
    declaration: &VariableDeclarationData,
) -> Result<(), AnalysisError> {
    for declarator in &declaration.declarations {
        let name = &declarator.id.name;
        match (&declarator.init, declaration.kind) {
            (Some(init), VariableDeclarationKind::Var) => {
                let value = evaluate_expression(ctx, init)?;
                ctx.state.scopes.assign(ctx.scope, name, value);
            }
            (None, VariableDeclarationKind::Var) => {}
            (Some(init), _) => {
                let value = evaluate_expression(ctx, init)?;
                ctx.state.scopes.declare(ctx.scope, name, value);
            }
            (None, _) => ctx
                .state
                .scopes
                .declare(ctx.scope, name, AbstractValue::Undefined),
        }
    }
    Ok(())
}
