// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Parser for the template expression language.
//!
//! Directive arguments, interpolation tags, `@for` headers and `@php` blocks
//! are all parsed here using the pest grammar in `expression.pest`. Binary
//! operator precedence is resolved with pest's Pratt parser:
//!
//! | Precedence (low → high) | Operators |
//! |---|---|
//! | 1 | `??` (right associative) |
//! | 2 | `\|\|`, `or` |
//! | 3 | `&&`, `and` |
//! | 4 | `==`, `!=`, `===`, `!==` |
//! | 5 | `<`, `<=`, `>`, `>=` |
//! | 6 | `+`, `-`, `~` |
//! | 7 | `*`, `/`, `%` |
//! | 8 | prefix `!`, `not`, `-` |
//!
//! The ternary `a ? b : c` binds looser than all of them.

use crate::ast::{BinaryOp, Expr, Statement, UnaryOp};
use lazy_static::lazy_static;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use serde_json::{Number, Value};
use std::fmt;

/// Pest parser generated from `expression.pest`.
#[derive(Parser)]
#[grammar = "expression.pest"]
pub struct ExpressionParser;

lazy_static! {
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::op_coalesce, Assoc::Right))
        .op(Op::infix(Rule::op_or, Assoc::Left))
        .op(Op::infix(Rule::op_and, Assoc::Left))
        .op(Op::infix(Rule::op_eq, Assoc::Left)
            | Op::infix(Rule::op_ne, Assoc::Left)
            | Op::infix(Rule::op_strict_eq, Assoc::Left)
            | Op::infix(Rule::op_strict_ne, Assoc::Left))
        .op(Op::infix(Rule::op_lt, Assoc::Left)
            | Op::infix(Rule::op_le, Assoc::Left)
            | Op::infix(Rule::op_gt, Assoc::Left)
            | Op::infix(Rule::op_ge, Assoc::Left))
        .op(Op::infix(Rule::op_add, Assoc::Left)
            | Op::infix(Rule::op_sub, Assoc::Left)
            | Op::infix(Rule::op_concat, Assoc::Left))
        .op(Op::infix(Rule::op_mul, Assoc::Left)
            | Op::infix(Rule::op_div, Assoc::Left)
            | Op::infix(Rule::op_mod, Assoc::Left))
        .op(Op::prefix(Rule::op_not) | Op::prefix(Rule::op_neg));
}

/// A parse failure inside an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSyntaxError {
    /// Human readable description.
    pub message: String,
    /// Byte offset into the expression source.
    pub offset: usize,
}

impl fmt::Display for ExpressionSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for ExpressionSyntaxError {}

impl From<pest::error::Error<Rule>> for ExpressionSyntaxError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let offset = match err.location {
            InputLocation::Pos(pos) => pos,
            InputLocation::Span((start, _)) => start,
        };
        Self {
            message: err.variant.message().into_owned(),
            offset,
        }
    }
}

type ParseResult<T> = std::result::Result<T, ExpressionSyntaxError>;

/// Header of a `@foreach` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachHeader {
    /// Source text of the iterable expression.
    pub iterable_source: String,
    /// The iterable expression.
    pub iterable: Expr,
    /// Optional key/index binding.
    pub key: Option<String>,
    /// Item binding.
    pub item: String,
}

/// Header of a `@for` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ForHeader {
    /// Statements run before the loop.
    pub init: Vec<Statement>,
    /// Source text and parsed form of the guard.
    pub condition: Option<(String, Expr)>,
    /// Statements run after each iteration.
    pub step: Vec<Statement>,
}

/// Parses a single expression such as `user.name ?? 'guest'`.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut pairs = ExpressionParser::parse(Rule::expression_root, source)?;
    let root = pairs
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| internal("expression"))?;
    build_expression(root)
}

/// Parses a comma separated argument list, as found in directive parentheses.
pub fn parse_arguments(source: &str) -> ParseResult<Vec<Expr>> {
    let mut pairs = ExpressionParser::parse(Rule::arguments_root, source)?;
    let root = pairs.next().ok_or_else(|| internal("arguments"))?;
    root.into_inner()
        .filter(|p| p.as_rule() == Rule::expression)
        .map(build_expression)
        .collect()
}

/// Parses `items as item` or `items as key => item`.
pub fn parse_foreach_header(source: &str) -> ParseResult<ForeachHeader> {
    let mut pairs = ExpressionParser::parse(Rule::foreach_root, source)?;
    let root = pairs.next().ok_or_else(|| internal("foreach header"))?;

    let mut iterable = None;
    let mut bindings = Vec::new();
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::expression => {
                let iterable_source = pair.as_str().trim().to_string();
                iterable = Some((iterable_source, build_expression(pair)?));
            }
            Rule::loop_binding => {
                bindings.extend(pair.into_inner().map(|v| variable_name(v.as_str())));
            }
            _ => {}
        }
    }

    let (iterable_source, iterable) = iterable.ok_or_else(|| internal("foreach iterable"))?;
    let (key, item) = match bindings.len() {
        1 => (None, bindings.remove(0)),
        2 => {
            let item = bindings.remove(1);
            (Some(bindings.remove(0)), item)
        }
        _ => return Err(internal("foreach binding")),
    };

    Ok(ForeachHeader { iterable_source, iterable, key, item })
}

/// Parses `init; condition; step` from a `@for` directive.
///
/// Every part may be empty. `init` and `step` accept comma separated
/// statements.
pub fn parse_for_header(source: &str) -> ParseResult<ForHeader> {
    let mut pairs = ExpressionParser::parse(Rule::for_root, source)?;
    let root = pairs.next().ok_or_else(|| internal("for header"))?;

    let mut header = ForHeader { init: Vec::new(), condition: None, step: Vec::new() };
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::for_init => {
                header.init = pair.into_inner().map(build_statement).collect::<ParseResult<_>>()?;
            }
            Rule::for_step => {
                header.step = pair.into_inner().map(build_statement).collect::<ParseResult<_>>()?;
            }
            Rule::expression => {
                header.condition = Some((pair.as_str().trim().to_string(), build_expression(pair)?));
            }
            _ => {}
        }
    }

    Ok(header)
}

/// Parses the body of a `@php` block: `;` separated assignment statements.
pub fn parse_statements(source: &str) -> ParseResult<Vec<Statement>> {
    let mut pairs = ExpressionParser::parse(Rule::statements_root, source)?;
    let root = pairs.next().ok_or_else(|| internal("statements"))?;
    root.into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_statement)
        .collect()
}

fn internal(what: &str) -> ExpressionSyntaxError {
    ExpressionSyntaxError {
        message: format!("malformed {}", what),
        offset: 0,
    }
}

fn variable_name(raw: &str) -> String {
    raw.trim_start_matches('$').to_string()
}

fn build_expression(pair: Pair<'_, Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let binary = inner.next().ok_or_else(|| internal("expression"))?;
    let expr = build_binary(binary)?;

    match inner.next() {
        Some(tail) if tail.as_rule() == Rule::ternary_tail => {
            let mut branches = tail.into_inner();
            let then_branch = build_expression(branches.next().ok_or_else(|| internal("ternary"))?)?;
            let else_branch = build_expression(branches.next().ok_or_else(|| internal("ternary"))?)?;
            Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        }
        _ => Ok(expr),
    }
}

fn build_binary(pair: Pair<'_, Rule>) -> ParseResult<Expr> {
    PRATT
        .map_primary(build_postfix)
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::op_not => UnaryOp::Not,
                Rule::op_neg => UnaryOp::Neg,
                _ => return Err(internal("prefix operator")),
            };
            Ok(Expr::Unary { op, operand: Box::new(operand?) })
        })
        .map_infix(|left, op, right| {
            let op = match op.as_rule() {
                Rule::op_coalesce => BinaryOp::Coalesce,
                Rule::op_or => BinaryOp::Or,
                Rule::op_and => BinaryOp::And,
                Rule::op_eq => BinaryOp::Eq,
                Rule::op_ne => BinaryOp::Ne,
                Rule::op_strict_eq => BinaryOp::StrictEq,
                Rule::op_strict_ne => BinaryOp::StrictNe,
                Rule::op_lt => BinaryOp::Lt,
                Rule::op_le => BinaryOp::Le,
                Rule::op_gt => BinaryOp::Gt,
                Rule::op_ge => BinaryOp::Ge,
                Rule::op_add => BinaryOp::Add,
                Rule::op_sub => BinaryOp::Sub,
                Rule::op_concat => BinaryOp::Concat,
                Rule::op_mul => BinaryOp::Mul,
                Rule::op_div => BinaryOp::Div,
                Rule::op_mod => BinaryOp::Mod,
                _ => return Err(internal("infix operator")),
            };
            Ok(Expr::Binary {
                op,
                left: Box::new(left?),
                right: Box::new(right?),
            })
        })
        .parse(pair.into_inner())
}

fn build_postfix(pair: Pair<'_, Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let primary = inner.next().ok_or_else(|| internal("primary"))?;
    let mut expr = build_primary(primary)?;

    for accessor in inner {
        expr = match accessor.as_rule() {
            Rule::member => {
                let property = accessor
                    .into_inner()
                    .next()
                    .ok_or_else(|| internal("member access"))?
                    .as_str()
                    .to_string();
                Expr::Member { object: Box::new(expr), property }
            }
            Rule::index => {
                let index = accessor.into_inner().next().ok_or_else(|| internal("index"))?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(build_expression(index)?),
                }
            }
            _ => return Err(internal("accessor")),
        };
    }

    Ok(expr)
}

fn build_primary(pair: Pair<'_, Rule>) -> ParseResult<Expr> {
    let offset = pair.as_span().start();
    match pair.as_rule() {
        Rule::null_lit => Ok(Expr::Literal(Value::Null)),
        Rule::true_lit => Ok(Expr::Literal(Value::Bool(true))),
        Rule::false_lit => Ok(Expr::Literal(Value::Bool(false))),
        Rule::integer => pair
            .as_str()
            .parse::<i64>()
            .map(|n| Expr::Literal(Value::from(n)))
            .map_err(|_| ExpressionSyntaxError {
                message: format!("integer literal {} is out of range", pair.as_str()),
                offset,
            }),
        Rule::float => {
            let parsed = pair.as_str().parse::<f64>().ok().and_then(Number::from_f64);
            parsed
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| ExpressionSyntaxError {
                    message: format!("invalid float literal {}", pair.as_str()),
                    offset,
                })
        }
        Rule::string => Ok(Expr::Literal(Value::String(unquote(pair.as_str())))),
        Rule::variable => Ok(Expr::Variable(variable_name(pair.as_str()))),
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().ok_or_else(|| internal("call"))?.as_str().to_string();
            let args = inner.map(build_expression).collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::Call { name, args })
        }
        Rule::array => build_array(pair),
        Rule::expression => build_expression(pair),
        _ => Err(ExpressionSyntaxError {
            message: format!("unexpected {:?}", pair.as_rule()),
            offset,
        }),
    }
}

fn build_array(pair: Pair<'_, Rule>) -> ParseResult<Expr> {
    let mut items = Vec::new();
    let mut keyed = false;

    for item in pair.into_inner() {
        let mut parts = item.into_inner();
        let first = build_expression(parts.next().ok_or_else(|| internal("array item"))?)?;
        match parts.next() {
            Some(value) => {
                keyed = true;
                items.push((Some(first), build_expression(value)?));
            }
            None => items.push((None, first)),
        }
    }

    if !keyed {
        return Ok(Expr::Array(items.into_iter().map(|(_, v)| v).collect()));
    }

    // Mixed lists get PHP-style positional keys for the unkeyed entries.
    let mut next_index = 0i64;
    let entries = items
        .into_iter()
        .map(|(key, value)| match key {
            Some(key) => (key, value),
            None => {
                let key = Expr::Literal(Value::String(next_index.to_string()));
                next_index += 1;
                (key, value)
            }
        })
        .collect();
    Ok(Expr::Map(entries))
}

fn build_statement(pair: Pair<'_, Rule>) -> ParseResult<Statement> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    let name = variable_name(inner.next().ok_or_else(|| internal("statement"))?.as_str());

    match rule {
        Rule::increment => Ok(Statement::Increment(name)),
        Rule::decrement => Ok(Statement::Decrement(name)),
        Rule::assign => {
            let value = build_expression(inner.next().ok_or_else(|| internal("assignment"))?)?;
            Ok(Statement::Assign { name, value })
        }
        Rule::compound_assign => {
            let op = match inner.next().ok_or_else(|| internal("assignment"))?.as_str() {
                "+=" => BinaryOp::Add,
                "-=" => BinaryOp::Sub,
                "*=" => BinaryOp::Mul,
                "/=" => BinaryOp::Div,
                _ => BinaryOp::Concat,
            };
            let value = build_expression(inner.next().ok_or_else(|| internal("assignment"))?)?;
            Ok(Statement::Compound { name, op, value })
        }
        _ => Err(internal("statement")),
    }
}

/// Strips the quotes from a string literal and resolves backslash escapes.
fn unquote(literal: &str) -> String {
    let body = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(q @ ('\\' | '\'' | '"')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
