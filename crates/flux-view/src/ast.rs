// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree (AST) types for Flux templates.
//!
//! This module defines the data structures that represent a compiled Flux
//! template. The tree is produced by the [`compiler`](crate::compiler) from
//! the token stream and consumed by the [`renderer`](crate::renderer).
//!
//! # Node Types
//!
//! The [`Node`] enum represents all possible template constructs:
//! - Literal text and interpolation (`{{ expr }}`, `{!! expr !!}`)
//! - Control flow blocks (`@if`, `@foreach`, `@for`, `@while`)
//! - Layout constructs (`@section`, `@yield`, `@include`)
//! - Guards (`@auth`, `@guest`) and helpers (`@json`, `@method`, `@csrf`)
//! - Component invocations (`<x-name>`)
//!
//! Expressions inside directives are parsed once at compile time into
//! [`Expr`] trees, so rendering never re-parses source text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source location information for error reporting and debugging.
///
/// Tracks the position of a syntax element within the source template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from the start of the source.
    pub start: usize,
    /// Byte offset of the end (exclusive).
    pub end: usize,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

/// An expression extracted from the template together with its source text.
///
/// The source text is kept so evaluation errors can quote what the author wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// The expression text as written.
    pub content: String,
    /// Source location for error reporting.
    pub span: Span,
    /// The parsed expression tree.
    pub expr: Expr,
}

/// A parsed expression in the sandboxed template expression language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal scalar: string, number, boolean or null.
    Literal(Value),
    /// A variable lookup in the current scope.
    Variable(String),
    /// Property access: `user.name` or `user->name`.
    Member {
        /// The value being accessed.
        object: Box<Expr>,
        /// The property name.
        property: String,
    },
    /// Subscript access: `items[0]`, `user['name']`.
    Index {
        /// The value being indexed.
        object: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
    },
    /// A list literal: `[1, 2, 3]`.
    Array(Vec<Expr>),
    /// A mapping literal: `['title' => 'Home']`.
    Map(Vec<(Expr, Expr)>),
    /// A prefix operator application.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// Its operand.
        operand: Box<Expr>,
    },
    /// An infix operator application.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `condition ? then : otherwise`.
    Ternary {
        /// The condition.
        condition: Box<Expr>,
        /// Value when the condition is truthy.
        then_branch: Box<Expr>,
        /// Value when the condition is falsy.
        else_branch: Box<Expr>,
    },
    /// A call to a builtin function.
    Call {
        /// The function name.
        name: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!x` / `not x`
    Not,
    /// `-x`
    Neg,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `??`
    Coalesce,
    /// `||` / `or`
    Or,
    /// `&&` / `and`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `~`
    Concat,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

/// An assignment statement, used by `@php` blocks and `@for` headers.
///
/// Only plain variables can be assigned; there is no way to reach host code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `name = value`
    Assign {
        /// Target variable.
        name: String,
        /// New value.
        value: Expr,
    },
    /// `name += value` and friends.
    Compound {
        /// Target variable.
        name: String,
        /// The operator applied to the current value and `value`.
        op: BinaryOp,
        /// Right-hand side.
        value: Expr,
    },
    /// `name++`
    Increment(String),
    /// `name--`
    Decrement(String),
}

/// A block of statements with the source text it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementBlock {
    /// The statements as written.
    pub content: String,
    /// Source location for error reporting.
    pub span: Span,
    /// Parsed statements, executed in order.
    pub statements: Vec<Statement>,
}

/// One `@if`/`@elseif` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// The guard expression.
    pub condition: Expression,
    /// Nodes rendered when the guard is truthy.
    pub body: Vec<Node>,
}

/// AST node types representing template structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Literal text copied to the output.
    Text {
        /// The text content, preserving whitespace.
        content: String,
    },
    /// `{{ expr }}` (escaped) or `{!! expr !!}` (raw).
    Echo {
        /// The expression to evaluate.
        expression: Expression,
        /// If true, pass the output through the engine's escaper.
        escaped: bool,
    },
    /// `@if` / `@elseif` / `@else` / `@endif`.
    If {
        /// The `@if` arm followed by any `@elseif` arms, in order.
        branches: Vec<Branch>,
        /// The `@else` body, if present.
        else_branch: Option<Vec<Node>>,
    },
    /// `@foreach(list as item)` / `@foreach(list as key => item)`.
    Foreach {
        /// Expression yielding the sequence or mapping.
        iterable: Expression,
        /// Optional variable bound to the index or key.
        key: Option<String>,
        /// Variable bound to the current item.
        item: String,
        /// Nodes rendered per iteration.
        body: Vec<Node>,
    },
    /// `@for(init; condition; step)`.
    For {
        /// Statements run once before the first iteration.
        init: StatementBlock,
        /// Loop guard; a missing guard is always true.
        condition: Option<Expression>,
        /// Statements run after every iteration.
        step: StatementBlock,
        /// Nodes rendered per iteration.
        body: Vec<Node>,
    },
    /// `@while(condition)`.
    While {
        /// Loop guard.
        condition: Expression,
        /// Nodes rendered per iteration.
        body: Vec<Node>,
    },
    /// `@php ... @endphp`, restricted to assignment statements.
    Statements(StatementBlock),
    /// `@section("name") ... @endsection`.
    Section {
        /// Section name.
        name: String,
        /// Nodes whose output is captured.
        body: Vec<Node>,
    },
    /// `@section("name", expr)`.
    InlineSection {
        /// Section name.
        name: String,
        /// Expression whose escaped value becomes the section content.
        value: Expression,
    },
    /// `@yield("name")` / `@yield("name", default)`.
    Yield {
        /// Section name.
        name: String,
        /// Fallback rendered (escaped) when the section is absent.
        default: Option<Expression>,
    },
    /// `@include("name")` / `@include("name", data)`.
    Include {
        /// Logical template name.
        name: String,
        /// Extra mapping merged over the current scope.
        data: Option<Expression>,
        /// Location of the directive.
        span: Span,
    },
    /// `@auth ... @endauth` (`authenticated = true`) or
    /// `@guest ... @endguest` (`authenticated = false`).
    AuthGuard {
        /// Required authentication state.
        authenticated: bool,
        /// Nodes rendered when the state matches.
        body: Vec<Node>,
    },
    /// `@json(expr)`.
    Json {
        /// Value to encode.
        expression: Expression,
    },
    /// `@method("PUT")`.
    MethodField {
        /// The HTTP method to spoof.
        method: String,
    },
    /// `@csrf`.
    CsrfField,
    /// `<x-name attr="v">slot</x-name>`.
    Component {
        /// Component name without the `x-` prefix.
        name: String,
        /// Attributes in source order, string values only.
        attributes: Vec<(String, String)>,
        /// Slot content, rendered in the caller's scope.
        slot: Vec<Node>,
        /// Location of the opening tag.
        span: Span,
    },
}
