// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Evaluation of parsed expressions and statements against a [`Scope`].
//!
//! In [`EvaluationMode::Strict`] an undefined variable, member or index is an
//! [`FluxError::ExpressionError`]; in [`EvaluationMode::Lenient`] it evaluates
//! to `null`. The left side of `??` and the arguments of `isset`, `empty` and
//! `default` are always evaluated leniently, since probing for missing values
//! is their purpose.

use crate::ast::{BinaryOp, Expr, Expression, Statement, StatementBlock, UnaryOp};
use crate::config::EvaluationMode;
use crate::error::{FluxError, Result};
use crate::functions;
use crate::scope::Scope;
use crate::value::{self, Arith};
use serde_json::{Map, Value};
use std::cmp::Ordering;

type EvalResult = std::result::Result<Value, String>;

/// Evaluates an expression.
pub fn evaluate(expression: &Expression, scope: &Scope<'_>, mode: EvaluationMode) -> Result<Value> {
    eval(&expression.expr, scope, mode == EvaluationMode::Strict)
        .map_err(|message| FluxError::expression(&expression.content, message))
}

/// Runs a block of assignment statements.
pub fn execute(block: &StatementBlock, scope: &mut Scope<'_>, mode: EvaluationMode) -> Result<()> {
    execute_statements(&block.statements, scope, mode)
        .map_err(|message| FluxError::expression(&block.content, message))
}

/// Runs statements, reporting failures as plain messages.
fn execute_statements(statements: &[Statement], scope: &mut Scope<'_>, mode: EvaluationMode) -> std::result::Result<(), String> {
    let strict = mode == EvaluationMode::Strict;

    for statement in statements {
        match statement {
            Statement::Assign { name, value } => {
                let value = eval(value, scope, strict)?;
                scope.assign(name, value);
            }
            Statement::Compound { name, op, value } => {
                let current = lookup_variable(name, scope, strict)?;
                let rhs = eval(value, scope, strict)?;
                let updated = binary_value(*op, &current, &rhs)?;
                scope.assign(name, updated);
            }
            Statement::Increment(name) | Statement::Decrement(name) => {
                let current = lookup_variable(name, scope, strict)?;
                let op = if matches!(statement, Statement::Increment(_)) { Arith::Add } else { Arith::Sub };
                let updated = value::arithmetic(op, &current, &Value::from(1))?;
                scope.assign(name, updated);
            }
        }
    }

    Ok(())
}

fn lookup_variable(name: &str, scope: &Scope<'_>, strict: bool) -> EvalResult {
    match scope.get(name) {
        Some(value) => Ok(value.clone()),
        None if strict => Err(format!("undefined variable '{}'", name)),
        None => Ok(Value::Null),
    }
}

fn eval(expr: &Expr, scope: &Scope<'_>, strict: bool) -> EvalResult {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => lookup_variable(name, scope, strict),
        Expr::Member { object, property } => {
            let object = eval(object, scope, strict)?;
            member(&object, property, strict)
        }
        Expr::Index { object, index } => {
            let object = eval(object, scope, strict)?;
            let index = eval(index, scope, strict)?;
            match &index {
                Value::String(key) => member(&object, key, strict),
                Value::Number(_) => member(&object, &value::to_output_string(&index), strict),
                other => Err(format!("cannot use {} as an index", value::type_name(other))),
            }
        }
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, scope, strict))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Map(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                let key = value::to_output_string(&eval(key, scope, strict)?);
                map.insert(key, eval(item, scope, strict)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Unary { op, operand } => {
            let operand = eval(operand, scope, strict)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value::is_truthy(&operand))),
                UnaryOp::Neg => value::arithmetic(Arith::Sub, &Value::from(0), &operand),
            }
        }
        Expr::Binary { op, left, right } => match op {
            BinaryOp::Coalesce => {
                let left = eval(left, scope, false)?;
                if left.is_null() {
                    eval(right, scope, strict)
                } else {
                    Ok(left)
                }
            }
            BinaryOp::And => {
                let left = eval(left, scope, strict)?;
                if !value::is_truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(value::is_truthy(&eval(right, scope, strict)?)))
            }
            BinaryOp::Or => {
                let left = eval(left, scope, strict)?;
                if value::is_truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(value::is_truthy(&eval(right, scope, strict)?)))
            }
            _ => {
                let left = eval(left, scope, strict)?;
                let right = eval(right, scope, strict)?;
                binary_value(*op, &left, &right)
            }
        },
        Expr::Ternary { condition, then_branch, else_branch } => {
            if value::is_truthy(&eval(condition, scope, strict)?) {
                eval(then_branch, scope, strict)
            } else {
                eval(else_branch, scope, strict)
            }
        }
        Expr::Call { name, args } => {
            if !functions::is_builtin(name) {
                return Err(format!("unknown function '{}'", name));
            }
            let arg_strict = strict && !functions::takes_lenient_args(name);
            let args = args
                .iter()
                .map(|arg| eval(arg, scope, arg_strict))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            functions::call(name, &args)
        }
    }
}

fn member(object: &Value, property: &str, strict: bool) -> EvalResult {
    let found = match object {
        Value::Object(map) => map.get(property),
        Value::Array(items) => property.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };

    match found {
        Some(value) => Ok(value.clone()),
        None if strict => Err(match object {
            Value::Object(_) | Value::Array(_) => format!("undefined key '{}'", property),
            other => format!("cannot read '{}' of {}", property, value::type_name(other)),
        }),
        None => Ok(Value::Null),
    }
}

/// Applies a non-short-circuiting binary operator to evaluated operands.
fn binary_value(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let ordering = |expected: &[Ordering]| -> EvalResult {
        match value::compare(left, right) {
            Some(ord) => Ok(Value::Bool(expected.contains(&ord))),
            None => Err(format!(
                "cannot compare {} with {}",
                value::type_name(left),
                value::type_name(right)
            )),
        }
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(value::loose_eq(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!value::loose_eq(left, right))),
        BinaryOp::StrictEq => Ok(Value::Bool(value::strict_eq(left, right))),
        BinaryOp::StrictNe => Ok(Value::Bool(!value::strict_eq(left, right))),
        BinaryOp::Lt => ordering(&[Ordering::Less]),
        BinaryOp::Le => ordering(&[Ordering::Less, Ordering::Equal]),
        BinaryOp::Gt => ordering(&[Ordering::Greater]),
        BinaryOp::Ge => ordering(&[Ordering::Greater, Ordering::Equal]),
        BinaryOp::Concat => Ok(Value::String(format!(
            "{}{}",
            value::to_output_string(left),
            value::to_output_string(right)
        ))),
        BinaryOp::Add => value::arithmetic(Arith::Add, left, right),
        BinaryOp::Sub => value::arithmetic(Arith::Sub, left, right),
        BinaryOp::Mul => value::arithmetic(Arith::Mul, left, right),
        BinaryOp::Div => value::arithmetic(Arith::Div, left, right),
        BinaryOp::Mod => value::arithmetic(Arith::Mod, left, right),
        BinaryOp::Coalesce => Ok(if left.is_null() { right.clone() } else { left.clone() }),
        BinaryOp::And => Ok(Value::Bool(value::is_truthy(left) && value::is_truthy(right))),
        BinaryOp::Or => Ok(Value::Bool(value::is_truthy(left) || value::is_truthy(right))),
    }
}
