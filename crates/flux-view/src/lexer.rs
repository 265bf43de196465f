// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tokenizer for Flux template source.
//!
//! Splits a template into literal text, interpolation tags, directives,
//! `@php` blocks and component tags. Every token carries a [`Span`] so the
//! compiler can report errors with line and column numbers.
//!
//! The tokenizer only checks that each construct is *lexically* complete
//! (closed tags, balanced argument parentheses). Pairing of block directives
//! is the compiler's job.

use crate::ast::Span;
use crate::error::{FluxError, Result};

/// Directives that must be followed by a parenthesised argument list.
const ARG_DIRECTIVES: &[&str] = &[
    "if", "elseif", "foreach", "for", "while", "extends", "section", "yield", "include", "json", "method",
];

/// Directives that never take arguments.
const BARE_DIRECTIVES: &[&str] = &[
    "else", "endif", "endforeach", "endfor", "endwhile", "endsection", "auth", "endauth", "guest",
    "endguest", "csrf", "endphp",
];

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal text.
    Text(String),
    /// `{{ content }}` or `{!! content !!}`.
    Echo {
        /// Trimmed expression source.
        content: String,
        /// False for the raw `{!! !!}` form.
        escaped: bool,
    },
    /// `@name` or `@name(args)`.
    Directive {
        /// Directive name without the `@`.
        name: String,
        /// Text between the outer parentheses.
        args: Option<String>,
    },
    /// Body of a `@php ... @endphp` block.
    RawBlock(String),
    /// `<x-name ...>` or `<x-name .../>`.
    ComponentOpen {
        /// Component name without the `x-` prefix.
        name: String,
        /// Raw attribute text.
        attributes: String,
        /// True for `<x-name/>`.
        self_closing: bool,
    },
    /// `</x-name>`.
    ComponentClose {
        /// Component name without the `x-` prefix.
        name: String,
    },
}

/// A token with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was found.
    pub kind: TokenKind,
    /// Where it was found.
    pub span: Span,
}

/// Returns true when `name` is a directive the tokenizer recognises.
pub fn is_directive(name: &str) -> bool {
    name == "php" || ARG_DIRECTIVES.contains(&name) || BARE_DIRECTIVES.contains(&name)
}

/// Tokenizes template source.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    text_start: usize,
    line_starts: Vec<usize>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            pos: 0,
            text_start: 0,
            line_starts,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];

            if rest.starts_with("{{") {
                self.echo("{{", "}}", true)?;
            } else if rest.starts_with("{!!") {
                self.echo("{!!", "!!}", false)?;
            } else if rest.starts_with("</x-") {
                self.component_close()?;
            } else if rest.starts_with("<x-") && rest[3..].starts_with(is_component_char) {
                self.component_open()?;
            } else if rest.starts_with('@') {
                self.at_sign()?;
            } else {
                self.advance_char();
            }
        }

        self.flush_text(self.pos);
        Ok(self.tokens)
    }

    fn advance_char(&mut self) {
        let len = self.source[self.pos..].chars().next().map_or(1, char::len_utf8);
        self.pos += len;
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let line_index = match self.line_starts.binary_search(&start) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = self.source[self.line_starts[line_index]..start].chars().count() + 1;
        Span {
            start,
            end,
            line: line_index + 1,
            column,
        }
    }

    fn error(&self, message: impl Into<String>, directive: impl Into<String>, at: usize) -> FluxError {
        let span = self.span(at, at);
        FluxError::syntax(message, directive, span.line, span.column)
    }

    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            let span = self.span(self.text_start, end);
            self.tokens.push(Token {
                kind: TokenKind::Text(self.source[self.text_start..end].to_string()),
                span,
            });
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.flush_text(start);
        let span = self.span(start, end);
        self.tokens.push(Token { kind, span });
        self.pos = end;
        self.text_start = end;
    }

    fn echo(&mut self, open: &str, close: &str, escaped: bool) -> Result<()> {
        let start = self.pos;
        let body_start = start + open.len();
        let close_at = find_outside_quotes(self.source, body_start, close)
            .ok_or_else(|| self.error(format!("unclosed `{}` tag", open), open, start))?;

        let content = self.source[body_start..close_at].trim().to_string();
        if content.is_empty() {
            return Err(self.error("empty interpolation", open, start));
        }

        self.push(TokenKind::Echo { content, escaped }, start, close_at + close.len());
        Ok(())
    }

    fn at_sign(&mut self) -> Result<()> {
        let start = self.pos;
        let after = &self.source[start + 1..];

        // `@@name` is an escaped literal `@name`.
        if after.starts_with('@') && after[1..].starts_with(is_ident_start) {
            self.flush_text(start + 1);
            self.pos = start + 2;
            self.text_start = self.pos;
            return Ok(());
        }

        let name_len = identifier_len(after);
        let name = &after[..name_len];
        if name_len == 0 || !is_directive(name) {
            self.pos += 1;
            return Ok(());
        }

        let name_end = start + 1 + name_len;
        let directive = format!("@{}", name);

        if name == "php" {
            return self.php(start, name_end);
        }

        if ARG_DIRECTIVES.contains(&name) {
            let paren = skip_inline_space(self.source, name_end);
            if !self.source[paren..].starts_with('(') {
                return Err(self.error(format!("{} requires an argument list", directive), directive, start));
            }
            let close = find_group_end(self.source, paren)
                .ok_or_else(|| self.error("unterminated argument list", directive.clone(), start))?;
            let args = self.source[paren + 1..close].to_string();
            self.push(
                TokenKind::Directive { name: name.to_string(), args: Some(args) },
                start,
                close + 1,
            );
            return Ok(());
        }

        // A bare directive swallows one following space or tab so that
        // `@else B` renders `B`.
        let mut end = name_end;
        if matches!(self.source[end..].chars().next(), Some(' ' | '\t')) {
            end += 1;
        }
        self.push(TokenKind::Directive { name: name.to_string(), args: None }, start, end);
        Ok(())
    }

    fn php(&mut self, start: usize, name_end: usize) -> Result<()> {
        // Inline form: `@php($count = 0)`.
        if self.source[name_end..].starts_with('(') {
            let close = find_group_end(self.source, name_end)
                .ok_or_else(|| self.error("unterminated argument list", "@php", start))?;
            let args = self.source[name_end + 1..close].to_string();
            self.push(
                TokenKind::Directive { name: "php".to_string(), args: Some(args) },
                start,
                close + 1,
            );
            return Ok(());
        }

        let end_at = self.source[name_end..]
            .find("@endphp")
            .map(|i| name_end + i)
            .ok_or_else(|| self.error("unclosed @php block", "@php", start))?;
        let body = self.source[name_end..end_at].to_string();
        self.push(TokenKind::RawBlock(body), start, end_at + "@endphp".len());
        Ok(())
    }

    fn component_open(&mut self) -> Result<()> {
        let start = self.pos;
        let name_start = start + 3;
        let name_len = self.source[name_start..]
            .find(|c: char| !is_component_char(c))
            .unwrap_or(self.source.len() - name_start);
        let name = self.source[name_start..name_start + name_len].to_string();
        let attrs_start = name_start + name_len;
        let tag = format!("<x-{}>", name);

        let close_at = find_outside_quotes(self.source, attrs_start, ">")
            .ok_or_else(|| self.error("unterminated component tag", tag.clone(), start))?;

        let raw = &self.source[attrs_start..close_at];
        let (attributes, self_closing) = match raw.strip_suffix('/') {
            Some(attrs) => (attrs, true),
            None => (raw, false),
        };

        if !attributes.is_empty() && !attributes.starts_with(char::is_whitespace) {
            return Err(self.error("invalid component name", tag, start));
        }

        self.push(
            TokenKind::ComponentOpen {
                name,
                attributes: attributes.trim().to_string(),
                self_closing,
            },
            start,
            close_at + 1,
        );
        Ok(())
    }

    fn component_close(&mut self) -> Result<()> {
        let start = self.pos;
        let name_start = start + 4;
        let name_len = self.source[name_start..]
            .find(|c: char| !is_component_char(c))
            .unwrap_or(self.source.len() - name_start);
        let name = self.source[name_start..name_start + name_len].to_string();
        let tag = format!("</x-{}>", name);

        let gt = skip_whitespace(self.source, name_start + name_len);
        if name.is_empty() || !self.source[gt..].starts_with('>') {
            return Err(self.error("malformed component close tag", tag, start));
        }

        self.push(TokenKind::ComponentClose { name }, start, gt + 1);
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_component_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.'
}

fn identifier_len(s: &str) -> usize {
    if !s.starts_with(is_ident_start) {
        return 0;
    }
    s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(s.len())
}

fn skip_inline_space(source: &str, from: usize) -> usize {
    from + source[from..].len() - source[from..].trim_start_matches([' ', '\t']).len()
}

fn skip_whitespace(source: &str, from: usize) -> usize {
    from + source[from..].len() - source[from..].trim_start().len()
}

/// Finds `needle` at or after `from`, ignoring occurrences inside quoted
/// strings.
fn find_outside_quotes(source: &str, from: usize, needle: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if bytes[i..].starts_with(needle.as_bytes()) {
                    return Some(i);
                }
                if b == b'\'' || b == b'"' {
                    quote = Some(b);
                }
            }
        }
        i += 1;
    }

    None
}

/// Given the index of an opening `(`, returns the index of its matching `)`.
fn find_group_end(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.to_string())
    }

    fn directive(name: &str, args: Option<&str>) -> TokenKind {
        TokenKind::Directive { name: name.to_string(), args: args.map(String::from) }
    }

    #[test]
    fn test_text_and_echo() {
        assert_eq!(
            kinds("Hello {{ name }}! {!! html !!}"),
            vec![
                text("Hello "),
                TokenKind::Echo { content: "name".into(), escaped: true },
                text("! "),
                TokenKind::Echo { content: "html".into(), escaped: false },
            ]
        );
    }

    #[test]
    fn test_echo_ignores_braces_in_strings() {
        assert_eq!(
            kinds("{{ '}}' ~ x }}"),
            vec![TokenKind::Echo { content: "'}}' ~ x".into(), escaped: true }]
        );
    }

    #[test]
    fn test_directives_with_and_without_args() {
        assert_eq!(
            kinds("@if(false)A@else B@endif"),
            vec![
                directive("if", Some("false")),
                text("A"),
                directive("else", None),
                text("B"),
                directive("endif", None),
            ]
        );
    }

    #[test]
    fn test_args_may_be_preceded_by_space_and_contain_parens() {
        assert_eq!(
            kinds("@if (count(items) > 0)"),
            vec![directive("if", Some("count(items) > 0"))]
        );
        assert_eq!(
            kinds("@section('a)b')"),
            vec![directive("section", Some("'a)b'"))]
        );
    }

    #[test]
    fn test_unknown_at_words_are_text() {
        assert_eq!(kinds("mail user@example.com"), vec![text("mail user@example.com")]);
        assert_eq!(kinds("@iffy"), vec![text("@iffy")]);
    }

    #[test]
    fn test_double_at_escapes() {
        assert_eq!(kinds("@@if(x)"), vec![text("@"), text("if(x)")]);
    }

    #[test]
    fn test_php_block() {
        assert_eq!(
            kinds("@php $a = 1; @endphp{{ a }}"),
            vec![
                TokenKind::RawBlock(" $a = 1; ".into()),
                TokenKind::Echo { content: "a".into(), escaped: true },
            ]
        );
        assert_eq!(kinds("@php($a = 1)"), vec![directive("php", Some("$a = 1"))]);
    }

    #[test]
    fn test_component_tags() {
        assert_eq!(
            kinds("<x-alert type=\"error\">Oops</x-alert><x-forms.input name='q' />"),
            vec![
                TokenKind::ComponentOpen { name: "alert".into(), attributes: "type=\"error\"".into(), self_closing: false },
                text("Oops"),
                TokenKind::ComponentClose { name: "alert".into() },
                TokenKind::ComponentOpen { name: "forms.input".into(), attributes: "name='q'".into(), self_closing: true },
            ]
        );
    }

    #[test]
    fn test_component_attribute_may_contain_gt() {
        assert_eq!(
            kinds("<x-a title=\"1 > 0\"/>"),
            vec![TokenKind::ComponentOpen { name: "a".into(), attributes: "title=\"1 > 0\"".into(), self_closing: true }]
        );
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let tokens = tokenize("line\n  @if(x)").unwrap();
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn test_unclosed_constructs_fail() {
        for source in ["{{ name", "{!! raw", "@if(x", "@php $a = 1;", "<x-card title=\"x\"", "@section"] {
            let err = tokenize(source).unwrap_err();
            assert!(matches!(err, FluxError::SyntaxError { .. }), "{source}: {err}");
        }
    }

    #[test]
    fn test_error_location() {
        match tokenize("ok\nok {{ x").unwrap_err() {
            FluxError::SyntaxError { line, column, directive, .. } => {
                assert_eq!((line, column), (2, 4));
                assert_eq!(directive, "{{");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
