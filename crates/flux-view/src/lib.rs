// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

// FluxError carries a source snippet for syntax errors.
#![allow(clippy::result_large_err)]

//! # Flux View
//!
//! Blade-style server-side template engine for the Flux web framework.
//!
//! Templates are compiled once into a node tree, cached by the hash of their
//! source, and rendered against a JSON-like data context. Expressions run in a
//! small sandboxed language; templates cannot execute host code.
//!
//! ## Features
//!
//! - Blade-style directives (`@if`, `@foreach`, `@for`, `@while`, `@php`)
//! - Layouts with sections (`@extends`, `@section`, `@yield`) and `@include`
//! - Components (`<x-alert type="error">...</x-alert>`) backed by callbacks or files
//! - `@auth`/`@guest` guards, `@json`, `@method` and `@csrf` helpers
//! - Built-in caching (memory or filesystem)
//! - Syntax errors with line, column and a source snippet
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flux_view::{Engine, FileSystemResolver};
//! use serde_json::json;
//!
//! let resolver = FileSystemResolver::new("app/Views");
//! let engine = Engine::with_memory_cache(resolver, 100)?;
//!
//! let html = engine.render_with("welcome", &json!({ "name": "World" }))?;
//! println!("{}", html);
//! # Ok::<(), flux_view::FluxError>(())
//! ```

/// Template AST types.
pub mod ast;
/// Compiled template caching.
pub mod cache;
/// Directive compiler.
pub mod compiler;
/// Component attribute parsing and callback registry.
pub mod component;
/// Engine configuration.
pub mod config;
/// Main template engine.
pub mod engine;
/// Error types and reporting.
pub mod error;
/// Expression evaluation.
pub mod evaluator;
/// Expression grammar and parser.
pub mod expression;
/// Builtin functions callable from expressions.
pub mod functions;
/// Template tokenizer.
pub mod lexer;
/// In-memory resource resolver for tests and embedding.
pub mod memory_resolver;
/// Template execution and the layout hop.
pub mod renderer;
/// Resource resolution.
pub mod resolver;
/// Variable scopes.
pub mod scope;
/// Value semantics: truthiness, stringification, comparison, escaping.
pub mod value;

pub use cache::*;
pub use compiler::{compile_template, CompiledTemplate};
pub use component::{ComponentCallback, ComponentRegistry};
pub use config::{EngineConfig, EvaluationMode};
pub use engine::{to_context, AuthCheck, Context, Engine};
pub use error::*;
pub use memory_resolver::MemoryResourceResolver;
pub use renderer::SectionTable;
pub use resolver::*;
pub use value::{html_escape, html_escaper, Escaper};
