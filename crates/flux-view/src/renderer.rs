// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Executes compiled templates.
//!
//! One call to [`render_template`] renders one template against one context:
//!
//! 1. The nodes run top to bottom over a fresh [`Scope`].
//! 2. `@section` bodies are captured into the call's [`SectionTable`] instead
//!    of being written out.
//! 3. If the template declared `@extends`, everything it wrote outside
//!    sections is dropped and the layout is rendered with the original
//!    context and the captured sections. A layout may not extend another.
//!
//! Includes, layouts and file components are rendered by nested calls one
//! level deeper; the depth is bounded by
//! [`EngineConfig::max_depth`](crate::EngineConfig::max_depth).

use crate::ast::{Expression, Node, Span, StatementBlock};
use crate::compiler::CompiledTemplate;
use crate::engine::{Context, Engine};
use crate::error::{FluxError, Result};
use crate::evaluator;
use crate::resolver::ResourceResolver;
use crate::scope::Scope;
use crate::value::{is_truthy, to_output_string, type_name};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Rendered section content by section name.
pub type SectionTable = BTreeMap<String, String>;

/// Renders `template` against `context`, performing the layout hop.
///
/// `label` names the template in errors and logs. `inherited` holds the
/// sections visible to `@yield` besides the ones this call captures itself.
pub(crate) fn render_template<R: ResourceResolver>(
    engine: &Engine<R>,
    template: &CompiledTemplate,
    label: &str,
    context: &Context,
    depth: usize,
    inherited: Option<&SectionTable>,
) -> Result<String> {
    let limit = engine.config().max_depth;
    if depth > limit {
        return Err(FluxError::RecursionLimitExceeded {
            limit,
            template: label.to_string(),
        });
    }

    debug!(template = label, depth, "rendering template");

    let mut renderer = Renderer {
        engine,
        depth,
        sections: SectionTable::new(),
        inherited,
    };
    let mut scope = Scope::new(context);
    let mut out = String::new();
    renderer.render_nodes(&template.nodes, &mut scope, &mut out)?;

    let Some(layout) = &template.layout else {
        return Ok(out);
    };

    let layout_template = engine.load(layout)?;
    if let Some(parent) = &layout_template.layout {
        return Err(FluxError::NestedLayoutError {
            layout: layout.clone(),
            parent: parent.clone(),
        });
    }

    debug!(template = label, layout = %layout, sections = renderer.sections.len(), "applying layout");
    render_template(engine, &layout_template, layout, context, depth + 1, Some(&renderer.sections))
}

struct Renderer<'r, R: ResourceResolver> {
    engine: &'r Engine<R>,
    depth: usize,
    sections: SectionTable,
    inherited: Option<&'r SectionTable>,
}

impl<R: ResourceResolver> Renderer<'_, R> {
    fn render_nodes(&mut self, nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) -> Result<()> {
        for node in nodes {
            self.render_node(node, scope, out)?;
        }
        Ok(())
    }

    fn capture(&mut self, nodes: &[Node], scope: &mut Scope<'_>) -> Result<String> {
        let mut buffer = String::new();
        self.render_nodes(nodes, scope, &mut buffer)?;
        Ok(buffer)
    }

    fn render_node(&mut self, node: &Node, scope: &mut Scope<'_>, out: &mut String) -> Result<()> {
        match node {
            Node::Text { content } => out.push_str(content),
            Node::Echo { expression, escaped } => {
                let text = to_output_string(&self.eval(expression, scope)?);
                if *escaped {
                    out.push_str(&self.engine.escape(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Node::If { branches, else_branch } => {
                for branch in branches {
                    if is_truthy(&self.eval(&branch.condition, scope)?) {
                        return self.render_nodes(&branch.body, scope, out);
                    }
                }
                if let Some(body) = else_branch {
                    self.render_nodes(body, scope, out)?;
                }
            }
            Node::Foreach { iterable, key, item, body } => {
                self.render_foreach(iterable, key.as_deref(), item, body, scope, out)?;
            }
            Node::For { init, condition, step, body } => {
                scope.push();
                let result = self.render_for(init, condition.as_ref(), step, body, scope, out);
                scope.pop();
                result?;
            }
            Node::While { condition, body } => {
                scope.push();
                let result = self.render_while(condition, body, scope, out);
                scope.pop();
                result?;
            }
            Node::Statements(block) => self.execute(block, scope)?,
            Node::Section { name, body } => {
                let content = self.capture(body, scope)?;
                self.sections.insert(name.clone(), content);
            }
            Node::InlineSection { name, value } => {
                let text = to_output_string(&self.eval(value, scope)?);
                let content = self.engine.escape(&text);
                self.sections.insert(name.clone(), content);
            }
            Node::Yield { name, default } => match self.section(name) {
                Some(content) => out.push_str(content),
                None => {
                    if let Some(default) = default {
                        let text = to_output_string(&self.eval(default, scope)?);
                        out.push_str(&self.engine.escape(&text));
                    }
                }
            },
            Node::Include { name, data, span } => {
                let html = self.render_include(name, data.as_ref(), *span, scope)?;
                out.push_str(&html);
            }
            Node::AuthGuard { authenticated, body } => {
                if self.engine.is_authenticated() == *authenticated {
                    self.render_nodes(body, scope, out)?;
                }
            }
            Node::Json { expression } => {
                out.push_str(&self.eval(expression, scope)?.to_string());
            }
            Node::MethodField { method } => {
                out.push_str(&format!(
                    "<input type=\"hidden\" name=\"_method\" value=\"{}\">",
                    self.engine.escape(method)
                ));
            }
            Node::CsrfField => {
                let token = scope.get("csrf_token").map(to_output_string).unwrap_or_default();
                out.push_str(&format!(
                    "<input type=\"hidden\" name=\"_token\" value=\"{}\">",
                    self.engine.escape(&token)
                ));
            }
            Node::Component { name, attributes, slot, span } => {
                let html = self.render_component(name, attributes, slot, *span, scope)?;
                out.push_str(&html);
            }
        }
        Ok(())
    }

    fn eval(&self, expression: &Expression, scope: &Scope<'_>) -> Result<Value> {
        evaluator::evaluate(expression, scope, self.engine.config().mode)
    }

    fn execute(&self, block: &StatementBlock, scope: &mut Scope<'_>) -> Result<()> {
        evaluator::execute(block, scope, self.engine.config().mode)
    }

    /// Section content: captured by this call first, then inherited.
    fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .get(name)
            .or_else(|| self.inherited.and_then(|table| table.get(name)))
            .map(String::as_str)
    }

    /// Every section visible to this call, for handing to an include.
    fn visible_sections(&self) -> SectionTable {
        let mut table = self.inherited.cloned().unwrap_or_default();
        table.extend(self.sections.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }

    fn render_foreach(
        &mut self,
        iterable: &Expression,
        key: Option<&str>,
        item: &str,
        body: &[Node],
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        let entries: Vec<(Value, Value)> = match self.eval(iterable, scope)? {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, value)| (Value::from(index), value))
                .collect(),
            Value::Object(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
            Value::Null => return Ok(()),
            other => {
                let message = format!("cannot iterate over {}", type_name(&other));
                if self.engine.config().mode == crate::config::EvaluationMode::Strict {
                    return Err(FluxError::expression(&iterable.content, message));
                }
                warn!(expression = %iterable.content, "{}", message);
                return Ok(());
            }
        };

        for (index, value) in entries {
            scope.push();
            if let Some(key) = key {
                scope.define(key, index);
            }
            scope.define(item, value);
            let result = self.render_nodes(body, scope, out);
            scope.pop();
            result?;
        }
        Ok(())
    }

    fn render_for(
        &mut self,
        init: &StatementBlock,
        condition: Option<&Expression>,
        step: &StatementBlock,
        body: &[Node],
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        let limit = self.engine.config().max_loop_iterations;
        self.execute(init, scope)?;

        let mut iterations = 0;
        loop {
            if let Some(condition) = condition {
                if !is_truthy(&self.eval(condition, scope)?) {
                    break;
                }
            }
            if iterations == limit {
                return Err(FluxError::LoopLimitExceeded { limit });
            }
            iterations += 1;

            self.render_nodes(body, scope, out)?;
            self.execute(step, scope)?;
        }
        Ok(())
    }

    fn render_while(
        &mut self,
        condition: &Expression,
        body: &[Node],
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        let limit = self.engine.config().max_loop_iterations;
        let mut iterations = 0;

        while is_truthy(&self.eval(condition, scope)?) {
            if iterations == limit {
                return Err(FluxError::LoopLimitExceeded { limit });
            }
            iterations += 1;
            self.render_nodes(body, scope, out)?;
        }
        Ok(())
    }

    fn render_include(
        &mut self,
        name: &str,
        data: Option<&Expression>,
        span: Span,
        scope: &Scope<'_>,
    ) -> Result<String> {
        let mut context = scope.flatten();

        if let Some(data) = data {
            match self.eval(data, scope)? {
                Value::Object(extra) => context.extend(extra),
                Value::Null => {}
                Value::Array(items) if items.is_empty() => {}
                other => {
                    return Err(FluxError::expression(
                        &data.content,
                        format!("include data must be a mapping, got {}", type_name(&other)),
                    ))
                }
            }
        }

        debug!(template = name, line = span.line, "including template");
        let template = self.engine.load(name)?;
        let sections = self.visible_sections();
        render_template(self.engine, &template, name, &context, self.depth + 1, Some(&sections))
    }

    fn render_component(
        &mut self,
        name: &str,
        attributes: &[(String, String)],
        slot: &[Node],
        span: Span,
        scope: &mut Scope<'_>,
    ) -> Result<String> {
        let slot_html = self.capture(slot, scope)?;

        let attribute_map: Context = attributes
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        let mut data = scope.flatten();
        data.extend(attribute_map.clone());
        data.insert("slot".to_string(), Value::String(slot_html.clone()));
        data.insert("attributes".to_string(), Value::Object(attribute_map));

        if let Some(callback) = self.engine.components().get(name) {
            debug!(component = name, "rendering component callback");
            return Ok(callback(&data, &slot_html));
        }

        let config = self.engine.config();
        let file = if config.component_namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", config.component_namespace, name)
        };

        match self.engine.load(&file) {
            Ok(template) => render_template(self.engine, &template, &file, &data, self.depth + 1, None),
            Err(FluxError::TemplateNotFound(missing)) if missing == file && !config.strict_components => {
                warn!(component = name, line = span.line, column = span.column, "component not found");
                Ok(format!("<!-- Component not found: {} -->", name))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::memory_resolver::MemoryResourceResolver;
    use serde_json::json;

    fn engine(templates: &[(&str, &str)]) -> Engine<MemoryResourceResolver> {
        let resolver = MemoryResourceResolver::new();
        for (name, source) in templates {
            resolver.add_resource(name, source);
        }
        Engine::new(resolver, Box::new(MemoryCache::new(32)))
    }

    fn context(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => Context::new(),
        }
    }

    #[test]
    fn test_sections_without_layout_are_not_written() {
        let engine = engine(&[]);
        let html = engine
            .render_string("a@section('s')hidden@endsection b @yield('s')", &Context::new())
            .unwrap();
        assert_eq!(html, "ab hidden");
    }

    #[test]
    fn test_layout_replaces_child_output() {
        let engine = engine(&[("layout", "[@yield('title')|@yield('body', 'none')]")]);
        let source = "@extends('layout')ignored@section('title')T@endsection";
        assert_eq!(engine.render_string(source, &Context::new()).unwrap(), "[T|none]");
    }

    #[test]
    fn test_redefined_section_last_wins() {
        let engine = engine(&[("layout", "@yield('s')")]);
        let source = "@extends('layout')@section('s')one@endsection@section('s')two@endsection";
        assert_eq!(engine.render_string(source, &Context::new()).unwrap(), "two");
    }

    #[test]
    fn test_include_inside_layout_sees_sections() {
        let engine = engine(&[
            ("layout", "<body>@include('partials.nav')</body>"),
            ("partials.nav", "<nav>@yield('nav')</nav>"),
        ]);
        let source = "@extends('layout')@section('nav')Home@endsection";
        assert_eq!(engine.render_string(source, &Context::new()).unwrap(), "<body><nav>Home</nav></body>");
    }

    #[test]
    fn test_include_data_must_be_a_mapping() {
        let engine = engine(&[("part", "{{ x }}")]);
        let err = engine.render_string("@include('part', 5)", &Context::new()).unwrap_err();
        assert!(matches!(err, FluxError::ExpressionError { .. }));

        let html = engine.render_string("@include('part', [])", &context(json!({ "x": 1 }))).unwrap();
        assert_eq!(html, "1");
    }

    #[test]
    fn test_foreach_over_scalar() {
        let engine = engine(&[]);
        let data = context(json!({ "n": 3 }));
        assert_eq!(engine.render_string("@foreach($n as $i)x@endforeach.", &data).unwrap(), ".");

        let strict = engine.with_config(crate::EngineConfig::strict()).unwrap();
        assert!(strict.render_string("@foreach($n as $i)x@endforeach", &data).is_err());
    }

    #[test]
    fn test_component_missing_inside_component_file_propagates() {
        let engine = engine(&[("components.card", "@include('missing')")]);
        let err = engine.render_string("<x-card/>", &Context::new()).unwrap_err();
        assert!(matches!(err, FluxError::TemplateNotFound(name) if name == "missing"));
    }
}
