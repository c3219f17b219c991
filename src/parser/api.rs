use std::rc::Rc;
use std::str::FromStr;

use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};
use pest::{Parser, Position, Span};
use pest_derive::Parser;

use super::ast::*;

#[derive(Parser)]
#[grammar = "parser/js_grammar.pest"] // relative to src
pub struct JsParser;

impl JsParser {
    /// Parses a whole program into the ranged AST used by the host.
    pub fn parse_to_ast_from_str(script: &str) -> Result<ProgramData, Error<Rule>> {
        let mut pairs = JsParser::parse(Rule::script, script)?;
        match pairs.next() {
            Some(pair) => build_ast_from_script(pair),
            None => Err(Error::new_from_pos(
                ErrorVariant::CustomError {
                    message: "Empty parse result".to_string(),
                },
                Position::from_start(script),
            )),
        }
    }
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    Meta {
        start_index: span.start(),
        end_index: span.end(),
    }
}

fn get_unexpected_error(id: i32, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn expect_next<'i>(
    pairs: &mut Pairs<'i, Rule>,
    parent: &Span<'i>,
) -> Result<Pair<'i, Rule>, Error<Rule>> {
    pairs.next().ok_or_else(|| {
        Error::new_from_span(
            ErrorVariant::CustomError {
                message: "Unexpected end of node".to_string(),
            },
            parent.clone(),
        )
    })
}

fn parse_operator<T: FromStr>(pair: &Pair<Rule>) -> Result<T, Error<Rule>> {
    pair.as_str()
        .parse::<T>()
        .map_err(|_| get_unexpected_error(2, pair))
}

fn span_meta(left: &ExpressionType, right_end: usize) -> Meta {
    Meta {
        start_index: left.get_meta().start_index,
        end_index: right_end,
    }
}

fn build_ast_from_script(pair: Pair<Rule>) -> Result<ProgramData, Error<Rule>> {
    let meta = get_meta(&pair);
    Ok(ProgramData {
        meta,
        body: build_ast_from_statement_list(pair.into_inner())?,
    })
}

fn build_ast_from_statement_list(pairs: Pairs<Rule>) -> Result<Vec<StatementType>, Error<Rule>> {
    let mut statements = vec![];
    for pair in pairs {
        match pair.as_rule() {
            Rule::statement => statements.push(build_ast_from_statement(pair)?),
            Rule::EOI => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(1, &pair)),
        }
    }
    Ok(statements)
}

fn build_ast_from_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let span = pair.as_span();
    let inner_pair = expect_next(&mut pair.into_inner(), &span)?;
    let meta = get_meta(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::function_declaration => StatementType::DeclarationStatement(
            DeclarationType::FunctionDeclaration(Rc::new(build_ast_from_function(inner_pair)?)),
        ),
        Rule::variable_statement => StatementType::DeclarationStatement(
            DeclarationType::VariableDeclaration(build_ast_from_variable_statement(inner_pair)?),
        ),
        Rule::block_statement => StatementType::BlockStatement {
            meta,
            body: build_ast_from_statement_list(inner_pair.into_inner())?,
        },
        Rule::empty_statement => StatementType::EmptyStatement { meta },
        Rule::if_statement => {
            let span = inner_pair.as_span();
            let mut inner = inner_pair.into_inner();
            expect_next(&mut inner, &span)?; // if
            let test = build_ast_from_expression(expect_next(&mut inner, &span)?)?;
            let consequent = build_ast_from_statement(expect_next(&mut inner, &span)?)?;
            let alternate = match inner.next() {
                Some(_else) => Some(Box::new(build_ast_from_statement(expect_next(
                    &mut inner, &span,
                )?)?)),
                None => None,
            };
            StatementType::IfStatement {
                meta,
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate,
            }
        }
        Rule::return_statement => {
            let mut inner = inner_pair.into_inner();
            inner.next(); // return
            let argument = match inner.next() {
                Some(expr) => Some(Box::new(build_ast_from_expression(expr)?)),
                None => None,
            };
            StatementType::ReturnStatement { meta, argument }
        }
        Rule::expression_statement => {
            let span = inner_pair.as_span();
            let expr = expect_next(&mut inner_pair.into_inner(), &span)?;
            StatementType::ExpressionStatement {
                meta,
                expression: Box::new(build_ast_from_expression(expr)?),
            }
        }
        _ => return Err(get_unexpected_error(3, &inner_pair)),
    })
}

fn build_ast_from_identifier(pair: &Pair<Rule>) -> IdentifierData {
    IdentifierData {
        name: pair.as_str().to_string(),
        meta: get_meta(pair),
    }
}

fn build_ast_from_function(pair: Pair<Rule>) -> Result<FunctionData, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut id = None;
    let mut params = vec![];
    let mut body = vec![];
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::kw_function => { /* Do nothing */ }
            Rule::identifier => id = Some(build_ast_from_identifier(&inner_pair)),
            Rule::formal_parameters => {
                for param in inner_pair.into_inner() {
                    params.push(build_ast_from_identifier(&param));
                }
            }
            Rule::function_body => body = build_ast_from_statement_list(inner_pair.into_inner())?,
            _ => return Err(get_unexpected_error(4, &inner_pair)),
        }
    }
    Ok(FunctionData {
        meta,
        id,
        params,
        body,
    })
}

fn build_ast_from_variable_statement(
    pair: Pair<Rule>,
) -> Result<VariableDeclarationData, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let kind_pair = expect_next(&mut inner, &span)?;
    let kind = match kind_pair.as_str() {
        "var" => VariableDeclarationKind::Var,
        "let" => VariableDeclarationKind::Let,
        "const" => VariableDeclarationKind::Const,
        _ => return Err(get_unexpected_error(5, &kind_pair)),
    };
    let mut declarations = vec![];
    for declaration in inner {
        let decl_meta = get_meta(&declaration);
        let decl_span = declaration.as_span();
        let mut decl_inner = declaration.into_inner();
        let id = build_ast_from_identifier(&expect_next(&mut decl_inner, &decl_span)?);
        let init = match decl_inner.next() {
            Some(init) => Some(Box::new(build_ast_from_assignment_expression(init)?)),
            None => None,
        };
        declarations.push(VariableDeclaratorData {
            meta: decl_meta,
            id,
            init,
        });
    }
    Ok(VariableDeclarationData {
        meta,
        kind,
        declarations,
    })
}

fn build_ast_from_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut expressions = vec![];
    for inner_pair in pair.into_inner() {
        expressions.push(build_ast_from_assignment_expression(inner_pair)?);
    }
    if expressions.len() == 1 {
        if let Some(only) = expressions.pop() {
            return Ok(only);
        }
    }
    Ok(ExpressionType::SequenceExpression { meta, expressions })
}

fn build_ast_from_assignment_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let first = expect_next(&mut inner, &span)?;
    match first.as_rule() {
        Rule::conditional_expression => build_ast_from_conditional_expression(first),
        Rule::left_hand_side_expression => {
            let left = build_ast_from_left_hand_side_expression(first)?;
            let operator = parse_operator::<AssignmentOperator>(&expect_next(&mut inner, &span)?)?;
            let right = build_ast_from_assignment_expression(expect_next(&mut inner, &span)?)?;
            Ok(ExpressionType::AssignmentExpression {
                meta,
                operator,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        _ => Err(get_unexpected_error(6, &first)),
    }
}

fn build_ast_from_conditional_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let test = build_ast_from_binary_chain(expect_next(&mut inner, &span)?)?;
    match inner.next() {
        None => Ok(test),
        Some(consequent) => {
            let consequent = build_ast_from_assignment_expression(consequent)?;
            let alternate = build_ast_from_assignment_expression(expect_next(&mut inner, &span)?)?;
            Ok(ExpressionType::ConditionalExpression {
                meta,
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            })
        }
    }
}

/// Folds `operand (op operand)*` left-associatively for every binary precedence level.
fn build_ast_from_binary_chain(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    if pair.as_rule() == Rule::unary_expression {
        return build_ast_from_unary_expression(pair);
    }
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let mut left = build_ast_from_binary_chain(expect_next(&mut inner, &span)?)?;
    while let Some(op_pair) = inner.next() {
        let right = build_ast_from_binary_chain(expect_next(&mut inner, &span)?)?;
        let meta = span_meta(&left, right.get_meta().end_index);
        left = match op_pair.as_rule() {
            Rule::or_op | Rule::and_op => ExpressionType::LogicalExpression {
                meta,
                operator: parse_operator(&op_pair)?,
                left: Box::new(left),
                right: Box::new(right),
            },
            Rule::multiplicative_op
            | Rule::additive_op
            | Rule::shift_op
            | Rule::relational_op
            | Rule::equality_op
            | Rule::bit_and_op
            | Rule::bit_xor_op
            | Rule::bit_or_op => ExpressionType::BinaryExpression {
                meta,
                operator: parse_operator(&op_pair)?,
                left: Box::new(left),
                right: Box::new(right),
            },
            _ => return Err(get_unexpected_error(7, &op_pair)),
        };
    }
    Ok(left)
}

fn build_ast_from_unary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let end_index = pair.as_span().end();
    let mut operators = vec![];
    let mut operand = None;
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::prefix_operator => operators.push(inner_pair),
            Rule::postfix_expression => {
                operand = Some(build_ast_from_postfix_expression(inner_pair)?)
            }
            _ => return Err(get_unexpected_error(8, &inner_pair)),
        }
    }
    let mut expr = match operand {
        Some(e) => e,
        None => {
            return Err(match operators.last() {
                Some(p) => get_unexpected_error(9, p),
                None => Error::new_from_pos(
                    ErrorVariant::CustomError {
                        message: "Empty unary expression".to_string(),
                    },
                    Position::from_start(""),
                ),
            })
        }
    };
    for op_pair in operators.into_iter().rev() {
        let meta = Meta {
            start_index: op_pair.as_span().start(),
            end_index,
        };
        expr = match op_pair.as_str() {
            "++" | "--" => ExpressionType::UpdateExpression {
                meta,
                operator: parse_operator(&op_pair)?,
                argument: Box::new(expr),
                prefix: true,
            },
            _ => ExpressionType::UnaryExpression {
                meta,
                operator: parse_operator(&op_pair)?,
                argument: Box::new(expr),
            },
        };
    }
    Ok(expr)
}

fn build_ast_from_postfix_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let argument = build_ast_from_left_hand_side_expression(expect_next(&mut inner, &span)?)?;
    Ok(match inner.next() {
        Some(op_pair) => ExpressionType::UpdateExpression {
            meta,
            operator: parse_operator(&op_pair)?,
            argument: Box::new(argument),
            prefix: false,
        },
        None => argument,
    })
}

fn build_ast_from_left_hand_side_expression(
    pair: Pair<Rule>,
) -> Result<ExpressionType, Error<Rule>> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let head_pair = expect_next(&mut inner, &span)?;
    let head = match head_pair.as_rule() {
        Rule::new_expression => build_ast_from_new_expression(head_pair)?,
        Rule::primary_expression => build_ast_from_primary_expression(head_pair)?,
        _ => return Err(get_unexpected_error(10, &head_pair)),
    };
    build_ast_from_suffixes(head, inner)
}

fn build_ast_from_suffixes(
    mut expr: ExpressionType,
    suffixes: Pairs<Rule>,
) -> Result<ExpressionType, Error<Rule>> {
    for suffix in suffixes {
        let meta = span_meta(&expr, suffix.as_span().end());
        expr = match suffix.as_rule() {
            Rule::arguments => ExpressionType::CallExpression {
                meta,
                callee: Box::new(expr),
                arguments: build_ast_from_arguments(suffix)?,
            },
            Rule::dot_member => {
                let span = suffix.as_span();
                let name = expect_next(&mut suffix.into_inner(), &span)?;
                ExpressionType::MemberExpression(MemberExpressionType::SimpleMemberExpression {
                    meta,
                    object: Box::new(expr),
                    property: build_ast_from_identifier(&name),
                })
            }
            Rule::bracket_member => {
                let span = suffix.as_span();
                let property =
                    build_ast_from_expression(expect_next(&mut suffix.into_inner(), &span)?)?;
                ExpressionType::MemberExpression(MemberExpressionType::ComputedMemberExpression {
                    meta,
                    object: Box::new(expr),
                    property: Box::new(property),
                })
            }
            _ => return Err(get_unexpected_error(11, &suffix)),
        };
    }
    Ok(expr)
}

fn build_ast_from_arguments(pair: Pair<Rule>) -> Result<Vec<ExpressionType>, Error<Rule>> {
    let mut args = vec![];
    for inner_pair in pair.into_inner() {
        args.push(build_ast_from_assignment_expression(inner_pair)?);
    }
    Ok(args)
}

fn build_ast_from_new_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    expect_next(&mut inner, &span)?; // new
    let callee_pair = expect_next(&mut inner, &span)?;
    let callee_span = callee_pair.as_span();
    let mut callee_inner = callee_pair.into_inner();
    let head = build_ast_from_primary_expression(expect_next(&mut callee_inner, &callee_span)?)?;
    let callee = build_ast_from_suffixes(head, callee_inner)?;
    let arguments = match inner.next() {
        Some(args) => build_ast_from_arguments(args)?,
        None => vec![],
    };
    Ok(ExpressionType::NewExpression {
        meta,
        callee: Box::new(callee),
        arguments,
    })
}

fn build_ast_from_primary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let span = pair.as_span();
    let inner_pair = expect_next(&mut pair.into_inner(), &span)?;
    let meta = get_meta(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::this_expression => ExpressionType::ThisExpression { meta },
        Rule::function_expression => {
            ExpressionType::FunctionExpression(Rc::new(build_ast_from_function(inner_pair)?))
        }
        Rule::null_literal => ExpressionType::Literal {
            meta,
            value: LiteralData::NullLiteral,
        },
        Rule::boolean_literal => ExpressionType::Literal {
            meta,
            value: LiteralData::BooleanLiteral(inner_pair.as_str() == "true"),
        },
        Rule::numeric_literal => ExpressionType::Literal {
            meta,
            value: LiteralData::NumberLiteral(build_ast_from_numeric_literal(&inner_pair)?),
        },
        Rule::string_literal => ExpressionType::Literal {
            meta,
            value: string_literal_data(&inner_pair),
        },
        Rule::regular_expression_literal => {
            let raw = inner_pair.as_str();
            let close = raw.rfind('/').unwrap_or(0);
            if close == 0 {
                return Err(get_unexpected_error(12, &inner_pair));
            }
            ExpressionType::Literal {
                meta,
                value: LiteralData::RegExpLiteral {
                    pattern: raw[1..close].to_string(),
                    flags: raw[close + 1..].to_string(),
                },
            }
        }
        Rule::array_literal => build_ast_from_array_literal(inner_pair)?,
        Rule::object_literal => build_ast_from_object_literal(inner_pair)?,
        Rule::parenthesized_expression => {
            let span = inner_pair.as_span();
            build_ast_from_expression(expect_next(&mut inner_pair.into_inner(), &span)?)?
        }
        Rule::identifier => ExpressionType::Identifier(build_ast_from_identifier(&inner_pair)),
        _ => return Err(get_unexpected_error(13, &inner_pair)),
    })
}

fn build_ast_from_array_literal(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut elements = vec![];
    let mut after_element = false;
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::array_comma => {
                if !after_element {
                    elements.push(None);
                }
                after_element = false;
            }
            Rule::assignment_expression => {
                elements.push(Some(build_ast_from_assignment_expression(inner_pair)?));
                after_element = true;
            }
            _ => return Err(get_unexpected_error(14, &inner_pair)),
        }
    }
    Ok(ExpressionType::ArrayExpression { meta, elements })
}

fn build_ast_from_object_literal(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut properties = vec![];
    for property in pair.into_inner() {
        let prop_meta = get_meta(&property);
        let span = property.as_span();
        let mut inner = property.into_inner();
        let first = expect_next(&mut inner, &span)?;
        let (key, value) = match first.as_rule() {
            Rule::identifier => {
                let id = build_ast_from_identifier(&first);
                (
                    PropertyKeyType::Named(id.name.clone()),
                    ExpressionType::Identifier(id),
                )
            }
            Rule::property_name => {
                let name_span = first.as_span();
                let name = expect_next(&mut first.into_inner(), &name_span)?;
                let key = match name.as_rule() {
                    Rule::identifier_name => PropertyKeyType::Named(name.as_str().to_string()),
                    Rule::string_literal => match build_ast_from_string_literal(&name) {
                        Some(key) => PropertyKeyType::Named(key),
                        None => PropertyKeyType::Computed(Box::new(ExpressionType::Literal {
                            meta: get_meta(&name),
                            value: LiteralData::UnpairedStringLiteral,
                        })),
                    },
                    Rule::numeric_literal => {
                        PropertyKeyType::Named(numeric_key(build_ast_from_numeric_literal(&name)?))
                    }
                    Rule::computed_property_name => {
                        let computed_span = name.as_span();
                        let expr = expect_next(&mut name.into_inner(), &computed_span)?;
                        PropertyKeyType::Computed(Box::new(
                            build_ast_from_assignment_expression(expr)?,
                        ))
                    }
                    _ => return Err(get_unexpected_error(15, &name)),
                };
                let value = build_ast_from_assignment_expression(expect_next(&mut inner, &span)?)?;
                (key, value)
            }
            _ => return Err(get_unexpected_error(16, &first)),
        };
        properties.push(PropertyData {
            meta: prop_meta,
            key,
            value: Box::new(value),
        });
    }
    Ok(ExpressionType::ObjectExpression { meta, properties })
}

fn numeric_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn build_ast_from_numeric_literal(pair: &Pair<Rule>) -> Result<f64, Error<Rule>> {
    let s = pair.as_str();
    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => 16,
        Some("0o") | Some("0O") => 8,
        Some("0b") | Some("0B") => 2,
        _ => 10,
    };
    if radix == 10 {
        return s.parse::<f64>().map_err(|_| get_unexpected_error(17, pair));
    }
    let mut num = 0_f64;
    for c in s[2..].chars() {
        match c.to_digit(radix) {
            Some(d) => num = num * radix as f64 + d as f64,
            None => return Err(get_unexpected_error(18, pair)),
        }
    }
    Ok(num)
}

fn build_ast_from_string_literal(pair: &Pair<Rule>) -> Option<String> {
    let s = pair.as_str();
    unescape_string(&s[1..s.len() - 1])
}

fn string_literal_data(pair: &Pair<Rule>) -> LiteralData {
    match build_ast_from_string_literal(pair) {
        Some(s) => LiteralData::StringLiteral(s),
        None => LiteralData::UnpairedStringLiteral,
    }
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::Chars>, count: usize) -> Option<u32> {
    let mut value = 0;
    for _ in 0..count {
        let d = chars.peek()?.to_digit(16)?;
        chars.next();
        value = value * 16 + d;
    }
    Some(value)
}

/// Resolves escape sequences of a string literal body. Escapes are
/// collected as UTF-16 units so split surrogate pairs recombine. `None` when
/// a surrogate is left unpaired.
fn unescape_string(raw: &str) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut buf = [0_u16; 2];
    while let Some(c) = chars.next() {
        if c != '\\' {
            units.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }
        let escaped = match chars.next() {
            Some(e) => e,
            None => break,
        };
        match escaped {
            'n' => units.push(0x0A),
            't' => units.push(0x09),
            'r' => units.push(0x0D),
            'b' => units.push(0x08),
            'f' => units.push(0x0C),
            'v' => units.push(0x0B),
            '\n' | '\u{2028}' | '\u{2029}' => { /* line continuation */ }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => match take_hex(&mut chars, 2) {
                Some(v) => units.push(v as u16),
                None => units.push('x' as u16),
            },
            'u' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut value: u32 = 0;
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                        chars.next();
                        value = value.saturating_mul(16).saturating_add(d);
                    }
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    }
                    let ch = char::from_u32(value).unwrap_or('\u{FFFD}');
                    units.extend_from_slice(ch.encode_utf16(&mut buf));
                } else {
                    match take_hex(&mut chars, 4) {
                        Some(v) => units.push(v as u16),
                        None => units.push('u' as u16),
                    }
                }
            }
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) if value * 8 + d <= 0o377 => {
                            chars.next();
                            value = value * 8 + d;
                        }
                        _ => break,
                    }
                }
                units.push(value as u16);
            }
            other => units.extend_from_slice(other.encode_utf16(&mut buf)),
        }
    }
    String::from_utf16(&units).ok()
}
