// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Directive compiler.
//!
//! Turns the token stream produced by the [`lexer`](crate::lexer) into a
//! [`CompiledTemplate`]. Block directives are matched with a recursive,
//! stack-shaped descent: each opener parses its body until one of its
//! terminators appears, so unbalanced or misplaced directives are reported
//! at the exact token that broke the structure.
//!
//! Compilation depends only on the source text. Compiling the same source
//! twice yields equal values (and identical serialized bytes), which is what
//! makes the content-hash cache sound.

use crate::ast::{Branch, Expr, Expression, Node, Span, StatementBlock};
use crate::cache::generate_cache_key;
use crate::component::parse_attributes;
use crate::error::{FluxError, Result};
use crate::expression::{self, ExpressionSyntaxError};
use crate::lexer::{self, Token, TokenKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::trace;

/// The compiled form of a template source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTemplate {
    /// SHA-256 of the source text, lowercase hex.
    pub hash: String,
    /// Layout declared with `@extends`, if any.
    pub layout: Option<String>,
    /// Top-level nodes.
    pub nodes: Vec<Node>,
    /// Templates referenced by `@extends` and `@include`, sorted.
    pub dependencies: Vec<String>,
}

/// Compiles template source.
///
/// `name` is only used to label syntax errors.
pub fn compile_template(source: &str, name: Option<&str>) -> Result<CompiledTemplate> {
    compile_inner(source)
        .map(|(layout, nodes, dependencies)| {
            trace!(template = name.unwrap_or("<inline>"), nodes = nodes.len(), "compiled template");
            CompiledTemplate {
                hash: generate_cache_key(source),
                layout,
                nodes,
                dependencies,
            }
        })
        .map_err(|e| e.with_source(source, name))
}

fn compile_inner(source: &str) -> Result<(Option<String>, Vec<Node>, Vec<String>)> {
    let tokens = lexer::tokenize(source)?;
    let mut compiler = Compiler::new(tokens);
    let (nodes, _) = compiler.parse_nodes(&[], None)?;
    Ok((compiler.layout, nodes, compiler.dependencies.into_iter().collect()))
}

/// How a block body ended.
struct Terminator {
    name: String,
    args: Option<String>,
    span: Span,
}

struct Compiler {
    tokens: std::vec::IntoIter<Token>,
    layout: Option<String>,
    open_section: Option<String>,
    section_closed: bool,
    dependencies: BTreeSet<String>,
}

impl Compiler {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            layout: None,
            open_section: None,
            section_closed: false,
            dependencies: BTreeSet::new(),
        }
    }

    /// Parses nodes until a directive in `stop` is reached, or, when
    /// `component` is set, until the matching `</x-component>` tag.
    ///
    /// Returns `None` as terminator when the input ran out.
    fn parse_nodes(&mut self, stop: &[&str], component: Option<&str>) -> Result<(Vec<Node>, Option<Terminator>)> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            let span = token.span;
            match token.kind {
                TokenKind::Text(content) => push_text(&mut nodes, content),
                TokenKind::Echo { content, escaped } => {
                    let directive = if escaped { "{{" } else { "{!!" };
                    let expression = parse_expr(&content, span, directive)?;
                    nodes.push(Node::Echo { expression, escaped });
                }
                TokenKind::RawBlock(body) => {
                    nodes.push(Node::Statements(parse_block(&body, span, "@php")?));
                }
                TokenKind::ComponentOpen { name, attributes, self_closing } => {
                    let slot = if self_closing {
                        Vec::new()
                    } else {
                        let (slot, end) = self.parse_nodes(&[], Some(&name))?;
                        if end.is_none() {
                            return Err(syntax(format!("component <x-{}> is never closed", name), format!("<x-{}>", name), span));
                        }
                        slot
                    };
                    nodes.push(Node::Component {
                        attributes: parse_attributes(&attributes),
                        name,
                        slot,
                        span,
                    });
                }
                TokenKind::ComponentClose { name } => {
                    let tag = format!("</x-{}>", name);
                    return match component {
                        Some(open) if open == name => Ok((nodes, Some(Terminator { name: tag, args: None, span }))),
                        Some(open) => Err(syntax(
                            format!("expected </x-{}> but found {}", open, tag),
                            tag,
                            span,
                        )),
                        None => Err(syntax(format!("{} has no matching opening tag", tag), tag, span)),
                    };
                }
                TokenKind::Directive { name, args } => {
                    if stop.contains(&name.as_str()) {
                        return Ok((nodes, Some(Terminator { name, args, span })));
                    }
                    if let Some(node) = self.directive(&name, args.as_deref(), span)? {
                        nodes.push(node);
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    /// Parses a block body that must end with one of `stop`.
    fn parse_block_body(&mut self, opener: &str, opener_span: Span, stop: &[&str]) -> Result<(Vec<Node>, Terminator)> {
        let (body, end) = self.parse_nodes(stop, None)?;
        match end {
            Some(end) => Ok((body, end)),
            None => Err(syntax(
                format!("@{} is never closed (expected @{})", opener, stop[stop.len() - 1]),
                format!("@{}", opener),
                opener_span,
            )),
        }
    }

    fn directive(&mut self, name: &str, args: Option<&str>, span: Span) -> Result<Option<Node>> {
        let directive = format!("@{}", name);
        let args = args.unwrap_or("");

        let node = match name {
            "if" => self.parse_if(args, span)?,
            "foreach" => {
                let header = expression::parse_foreach_header(args).map_err(|e| expr_error(e, &directive, span))?;
                let (body, _) = self.parse_block_body(name, span, &["endforeach"])?;
                Node::Foreach {
                    iterable: Expression {
                        content: header.iterable_source,
                        span,
                        expr: header.iterable,
                    },
                    key: header.key,
                    item: header.item,
                    body,
                }
            }
            "for" => {
                let header = expression::parse_for_header(args).map_err(|e| expr_error(e, &directive, span))?;
                let (body, _) = self.parse_block_body(name, span, &["endfor"])?;
                Node::For {
                    init: StatementBlock { content: args.to_string(), span, statements: header.init },
                    condition: header
                        .condition
                        .map(|(content, expr)| Expression { content, span, expr }),
                    step: StatementBlock { content: args.to_string(), span, statements: header.step },
                    body,
                }
            }
            "while" => {
                let condition = parse_expr(args, span, &directive)?;
                let (body, _) = self.parse_block_body(name, span, &["endwhile"])?;
                Node::While { condition, body }
            }
            "php" => Node::Statements(parse_block(args, span, &directive)?),
            "auth" | "guest" => {
                let end = format!("end{}", name);
                let (body, _) = self.parse_block_body(name, span, &[end.as_str()])?;
                Node::AuthGuard { authenticated: name == "auth", body }
            }
            "extends" => {
                self.parse_extends(args, span)?;
                return Ok(None);
            }
            "section" => self.parse_section(args, span)?,
            "yield" => {
                let mut parsed = parse_args(args, span, &directive, 1, 2)?;
                let default = parsed.pop_second(args, span);
                Node::Yield {
                    name: literal_name(parsed.first, &directive, span)?,
                    default,
                }
            }
            "include" => {
                let mut parsed = parse_args(args, span, &directive, 1, 2)?;
                let data = parsed.pop_second(args, span);
                let include = literal_name(parsed.first, &directive, span)?;
                self.dependencies.insert(include.clone());
                Node::Include { name: include, data, span }
            }
            "json" => Node::Json { expression: parse_expr(args, span, &directive)? },
            "method" => {
                let parsed = parse_args(args, span, &directive, 1, 1)?;
                Node::MethodField { method: literal_name(parsed.first, &directive, span)?.to_uppercase() }
            }
            "csrf" => Node::CsrfField,
            "else" | "elseif" => {
                return Err(syntax(format!("{} without a matching @if", directive), directive, span));
            }
            _ => {
                return Err(syntax(format!("unexpected {}", directive), directive, span));
            }
        };

        Ok(Some(node))
    }

    fn parse_if(&mut self, args: &str, span: Span) -> Result<Node> {
        let mut branches = Vec::new();
        let mut condition = parse_expr(args, span, "@if")?;

        loop {
            let (body, end) = self.parse_block_body("if", span, &["elseif", "else", "endif"])?;
            branches.push(Branch { condition, body });

            match end.name.as_str() {
                "elseif" => {
                    condition = parse_expr(end.args.as_deref().unwrap_or(""), end.span, "@elseif")?;
                }
                "else" => {
                    let (body, end) = self.parse_block_body("if", span, &["elseif", "else", "endif"])?;
                    if end.name != "endif" {
                        return Err(syntax(
                            format!("@{} after @else", end.name),
                            format!("@{}", end.name),
                            end.span,
                        ));
                    }
                    return Ok(Node::If { branches, else_branch: Some(body) });
                }
                _ => return Ok(Node::If { branches, else_branch: None }),
            }
        }
    }

    fn parse_extends(&mut self, args: &str, span: Span) -> Result<()> {
        if let Some(existing) = &self.layout {
            return Err(syntax(
                format!("template already extends '{}'", existing),
                "@extends",
                span,
            ));
        }
        if self.section_closed {
            return Err(syntax("@extends must appear before any @endsection", "@extends", span));
        }
        let parsed = parse_args(args, span, "@extends", 1, 1)?;
        let layout = literal_name(parsed.first, "@extends", span)?;
        self.dependencies.insert(layout.clone());
        self.layout = Some(layout);
        Ok(())
    }

    fn parse_section(&mut self, args: &str, span: Span) -> Result<Node> {
        let mut parsed = parse_args(args, span, "@section", 1, 2)?;
        let value = parsed.pop_second(args, span);
        let name = literal_name(parsed.first, "@section", span)?;

        if let Some(value) = value {
            return Ok(Node::InlineSection { name, value });
        }

        if let Some(open) = &self.open_section {
            return Err(syntax(
                format!("cannot open section '{}' while section '{}' is still open", name, open),
                "@section",
                span,
            ));
        }

        self.open_section = Some(name.clone());
        let (body, _) = self.parse_block_body("section", span, &["endsection"])?;
        self.open_section = None;
        self.section_closed = true;

        Ok(Node::Section { name, body })
    }
}

/// Arguments of a directive, split into the first argument and the rest.
struct ParsedArgs {
    first: Expr,
    second: Option<Expr>,
}

impl ParsedArgs {
    fn pop_second(&mut self, source: &str, span: Span) -> Option<Expression> {
        self.second.take().map(|expr| Expression {
            content: second_argument_source(source),
            span,
            expr,
        })
    }
}

fn parse_args(args: &str, span: Span, directive: &str, min: usize, max: usize) -> Result<ParsedArgs> {
    let mut parsed = expression::parse_arguments(args).map_err(|e| expr_error(e, directive, span))?;
    if parsed.len() < min || parsed.len() > max {
        let expected = if min == max { min.to_string() } else { format!("{} to {}", min, max) };
        return Err(syntax(
            format!("{} expects {} argument(s), got {}", directive, expected, parsed.len()),
            directive,
            span,
        ));
    }
    let second = if parsed.len() > 1 { parsed.pop() } else { None };
    let first = parsed.remove(0);
    Ok(ParsedArgs { first, second })
}

/// Best-effort source text of the second argument, for error messages.
fn second_argument_source(args: &str) -> String {
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    for (i, c) in args.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => return args[i + 1..].trim().to_string(),
            _ => {}
        }
    }
    args.trim().to_string()
}

fn literal_name(expr: Expr, directive: &str, span: Span) -> Result<String> {
    match expr {
        Expr::Literal(Value::String(name)) => Ok(name),
        _ => Err(syntax(
            format!("{} expects a quoted name as its first argument", directive),
            directive,
            span,
        )),
    }
}

fn parse_expr(content: &str, span: Span, directive: &str) -> Result<Expression> {
    let expr = expression::parse_expression(content).map_err(|e| expr_error(e, directive, span))?;
    Ok(Expression {
        content: content.trim().to_string(),
        span,
        expr,
    })
}

fn parse_block(content: &str, span: Span, directive: &str) -> Result<StatementBlock> {
    let statements = expression::parse_statements(content).map_err(|e| expr_error(e, directive, span))?;
    Ok(StatementBlock {
        content: content.trim().to_string(),
        span,
        statements,
    })
}

fn push_text(nodes: &mut Vec<Node>, content: String) {
    if let Some(Node::Text { content: previous }) = nodes.last_mut() {
        previous.push_str(&content);
    } else {
        nodes.push(Node::Text { content });
    }
}

fn syntax(message: impl Into<String>, directive: impl Into<String>, span: Span) -> FluxError {
    FluxError::syntax(message, directive, span.line, span.column)
}

fn expr_error(err: ExpressionSyntaxError, directive: &str, span: Span) -> FluxError {
    syntax(format!("invalid expression: {}", err), directive, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<CompiledTemplate> {
        compile_template(source, Some("test"))
    }

    fn syntax_directive(source: &str) -> String {
        match compile(source).unwrap_err() {
            FluxError::SyntaxError { directive, .. } => directive,
            other => panic!("expected syntax error for {source:?}, got {other}"),
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = "@extends('layouts.app')@section('title')Hi {{ name }}@endsection";
        let a = compile(source).unwrap();
        let b = compile(source).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
        assert_eq!(a.layout.as_deref(), Some("layouts.app"));
        assert_eq!(a.hash.len(), 64);
    }

    #[test]
    fn test_if_elseif_else() {
        let template = compile("@if(a)A@elseif(b)B@else C@endif").unwrap();
        match &template.nodes[0] {
            Node::If { branches, else_branch } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].condition.content, "b");
                assert_eq!(else_branch.as_ref().unwrap(), &vec![Node::Text { content: "C".into() }]);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let template = compile("@foreach(rows as row)@if(row.ok){{ row.name }}@endif@endforeach").unwrap();
        match &template.nodes[0] {
            Node::Foreach { item, body, .. } => {
                assert_eq!(item, "row");
                assert!(matches!(body[0], Node::If { .. }));
            }
            other => panic!("expected foreach, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_section_is_rejected() {
        let source = "@section('a')one @section('b')two@endsection@endsection";
        assert_eq!(syntax_directive(source), "@section");
    }

    #[test]
    fn test_sibling_sections_are_fine() {
        let template = compile("@section('a')1@endsection@section('a')2@endsection").unwrap();
        assert_eq!(template.nodes.len(), 2);
    }

    #[test]
    fn test_unbalanced_directives() {
        assert_eq!(syntax_directive("@if(x) open"), "@if");
        assert_eq!(syntax_directive("text @endif"), "@endif");
        assert_eq!(syntax_directive("@else"), "@else");
        assert_eq!(syntax_directive("@if(a)@else x @elseif(b)@endif"), "@elseif");
        assert_eq!(syntax_directive("@foreach(a as b)@endfor"), "@endfor");
        assert_eq!(syntax_directive("@endsection"), "@endsection");
    }

    #[test]
    fn test_extends_rules() {
        assert_eq!(syntax_directive("@extends('a')@extends('b')"), "@extends");
        assert_eq!(syntax_directive("@section('s')x@endsection@extends('a')"), "@extends");
        assert_eq!(syntax_directive("@extends(layout)"), "@extends");
    }

    #[test]
    fn test_component_tags() {
        let template = compile("<x-card title=\"Hi\"><x-card>inner</x-card></x-card><x-icon name='x'/>").unwrap();
        match &template.nodes[0] {
            Node::Component { name, attributes, slot, .. } => {
                assert_eq!(name, "card");
                assert_eq!(attributes, &vec![("title".to_string(), "Hi".to_string())]);
                assert!(matches!(&slot[0], Node::Component { name, .. } if name == "card"));
            }
            other => panic!("expected component, got {other:?}"),
        }
        assert!(matches!(&template.nodes[1], Node::Component { slot, .. } if slot.is_empty()));
    }

    #[test]
    fn test_component_tag_errors() {
        assert_eq!(syntax_directive("<x-card>body"), "<x-card>");
        assert_eq!(syntax_directive("<x-card></x-panel>"), "</x-panel>");
        assert_eq!(syntax_directive("</x-card>"), "</x-card>");
        assert_eq!(syntax_directive("<x-card>@if(a)</x-card>@endif"), "</x-card>");
    }

    #[test]
    fn test_malformed_expression() {
        assert_eq!(syntax_directive("{{ a + }}"), "{{");
        assert_eq!(syntax_directive("@if(a ==)x@endif"), "@if");
    }

    #[test]
    fn test_error_carries_location_and_snippet() {
        match compile("<p>\n  @section('a')\n  @section('b')\n").unwrap_err() {
            FluxError::SyntaxError { line, column, file, source_context, .. } => {
                assert_eq!((line, column), (3, 3));
                assert_eq!(file.as_deref(), Some("test"));
                assert!(source_context.unwrap().format_snippet().contains("@section('b')"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dependencies_are_sorted() {
        let template = compile("@extends('layout')@include('z.nav')@include('a.head', ['x' => 1])").unwrap();
        assert_eq!(template.dependencies, vec!["a.head", "layout", "z.nav"]);
    }

    #[test]
    fn test_inline_section_and_yield_default() {
        let template = compile("@section('title', page.title)@yield('footer', 'none')").unwrap();
        assert!(matches!(&template.nodes[0], Node::InlineSection { name, value } if name == "title" && value.content == "page.title"));
        assert!(matches!(&template.nodes[1], Node::Yield { default: Some(d), .. } if d.content == "'none'"));
    }

    #[test]
    fn test_method_is_uppercased() {
        let template = compile("@method('put')").unwrap();
        assert_eq!(template.nodes, vec![Node::MethodField { method: "PUT".into() }]);
    }
}
