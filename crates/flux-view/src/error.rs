// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the Flux view engine.
//!
//! This module defines [`FluxError`], the main error enum, and helper types
//! for rich error reporting with source context.
//!
//! # Error Categories
//!
//! - **Syntax errors**: Malformed or unbalanced directives and expressions
//! - **Layout errors**: A layout that itself declares a layout
//! - **Resolution errors**: Template or component file not found
//! - **Recursion errors**: Include/component nesting beyond the configured depth
//! - **Expression errors**: Evaluation failures (undefined values in strict mode,
//!   type mismatches, unknown functions)
//! - **Cache errors**: Caching operation failures
//!
//! Every category is a distinct variant so callers can match on it and render
//! a fallback page of their choosing.
//!
//! # Source Context
//!
//! Syntax errors include [`SourceContext`] for rich error messages
//! showing the problematic code with line numbers and a caret pointing
//! to the exact error location.

use thiserror::Error;
use std::fmt;

/// Source context for enhanced error messages.
///
/// Captures a snippet of source code around an error location,
/// enabling rich error messages with line numbers and visual indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceContext {
    /// All lines from the source file.
    pub lines: Vec<String>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// The column number where the error occurred (1-indexed).
    pub error_column: usize,
    /// First line number of the snippet (1-indexed).
    pub snippet_start: usize,
    /// Last line number of the snippet (1-indexed).
    pub snippet_end: usize,
}

impl SourceContext {
    /// Creates a source context from source code and error location.
    ///
    /// Captures 2 lines before and after the error line for context.
    pub fn from_source(source: &str, line: usize, column: usize) -> Self {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
        let snippet_start = line.saturating_sub(2).max(1);
        let snippet_end = (line + 2).min(lines.len());

        Self {
            lines,
            error_line: line,
            error_column: column,
            snippet_start,
            snippet_end,
        }
    }

    /// Formats the source snippet with line numbers and error indicator.
    ///
    /// Returns a string like:
    /// ```text
    ///    4 | <ul>
    ///    5 |   @foreach(items as item)
    ///      |   ^
    ///    6 | </ul>
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();

        for line_num in self.snippet_start..=self.snippet_end {
            if line_num == 0 || line_num > self.lines.len() {
                break;
            }

            let line = &self.lines[line_num - 1];
            result.push_str(&format!("{:4} | {}\n", line_num, line));

            if line_num == self.error_line {
                result.push_str(&format!("     | {}^\n", " ".repeat(self.error_column.saturating_sub(1))));
            }
        }

        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// Helper struct for displaying optional source context.
pub struct OptSourceContextDisplay<'a>(pub &'a Option<SourceContext>);

impl fmt::Display for OptSourceContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ctx) => write!(f, "\n{}", ctx),
            None => Ok(()),
        }
    }
}

/// Helper trait for formatting optional source context.
pub trait AsDisplay<'a> {
    /// Wraps self for Display formatting.
    fn as_display(&'a self) -> OptSourceContextDisplay<'a>;
}

impl<'a> AsDisplay<'a> for Option<SourceContext> {
    fn as_display(&'a self) -> OptSourceContextDisplay<'a> {
        OptSourceContextDisplay(self)
    }
}

/// Helper for the optional file name in syntax errors.
struct OptFileDisplay<'a>(&'a Option<String>);

impl fmt::Display for OptFileDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(file) => write!(f, " in {}", file),
            None => Ok(()),
        }
    }
}

/// The main error type for Flux view operations.
#[derive(Error, Debug)]
pub enum FluxError {
    /// A directive, interpolation tag, component tag or expression is
    /// malformed or unbalanced.
    #[error(
        "Syntax error{} at line {line}, column {column} ({directive}): {message}{}",
        OptFileDisplay(file),
        source_context.as_display()
    )]
    SyntaxError {
        /// Description of the problem.
        message: String,
        /// The offending directive or tag (e.g. `@section`, `{{`, `<x-card>`).
        directive: String,
        /// Line number where the offending token starts (1-indexed).
        line: usize,
        /// Column number where the offending token starts (1-indexed).
        column: usize,
        /// The template name, if known.
        file: Option<String>,
        /// Source context for rich error display.
        source_context: Option<SourceContext>,
    },

    /// A layout template itself declares `@extends`.
    #[error("Layout '{layout}' cannot extend '{parent}': nested layouts are not supported")]
    NestedLayoutError {
        /// The layout being rendered.
        layout: String,
        /// The layout it tried to extend.
        parent: String,
    },

    /// The resolver could not find a template, layout or component file.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Include/component/layout nesting exceeded the configured bound.
    #[error("Recursion limit of {limit} exceeded while rendering '{template}'")]
    RecursionLimitExceeded {
        /// The configured maximum depth.
        limit: usize,
        /// The template that would have exceeded the limit.
        template: String,
    },

    /// An expression failed to evaluate.
    #[error("Error evaluating `{expression}`: {message}")]
    ExpressionError {
        /// The expression source text.
        expression: String,
        /// What went wrong.
        message: String,
    },

    /// A single loop ran more iterations than allowed.
    #[error("Loop exceeded the limit of {limit} iterations")]
    LoopLimitExceeded {
        /// The configured maximum number of iterations.
        limit: usize,
    },

    /// Cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Engine configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FluxError {
    /// Builds a syntax error without source context; the compiler attaches
    /// the context once the whole source is known.
    pub fn syntax(message: impl Into<String>, directive: impl Into<String>, line: usize, column: usize) -> Self {
        FluxError::SyntaxError {
            message: message.into(),
            directive: directive.into(),
            line,
            column,
            file: None,
            source_context: None,
        }
    }

    /// Builds an expression evaluation error.
    pub fn expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        FluxError::ExpressionError {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Attaches the template name and a source snippet to a syntax error.
    /// Other variants pass through unchanged.
    pub fn with_source(self, source: &str, template_name: Option<&str>) -> Self {
        match self {
            FluxError::SyntaxError { message, directive, line, column, file, .. } => {
                FluxError::SyntaxError {
                    message,
                    directive,
                    line,
                    column,
                    file: file.or_else(|| template_name.map(String::from)),
                    source_context: Some(SourceContext::from_source(source, line, column)),
                }
            }
            other => other,
        }
    }
}

/// Convenience type alias for Results with [`FluxError`].
pub type Result<T> = std::result::Result<T, FluxError>;
