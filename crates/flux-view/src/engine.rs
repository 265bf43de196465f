// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Flux template engine for compiling and rendering views.
//!
//! This module provides the core [`Engine`] type that handles the complete
//! template lifecycle: resolution, compilation, caching, and rendering.
//!
//! # Quick Start
//!
//! ```rust
//! use flux_view::{Engine, MemoryResourceResolver};
//! use serde_json::json;
//!
//! let resolver = MemoryResourceResolver::new();
//! resolver.add_resource("layouts.app", "<main>@yield('content')</main>");
//! resolver.add_resource("home", "@extends('layouts.app')@section('content')Hi {{ $name }}@endsection");
//!
//! let engine = Engine::with_memory_cache(resolver, 100)?;
//! let html = engine.render_with("home", &json!({ "name": "Ada" }))?;
//! assert_eq!(html, "<main>Hi Ada</main>");
//! # Ok::<(), flux_view::FluxError>(())
//! ```
//!
//! # Architecture
//!
//! The engine coordinates several subsystems:
//!
//! - **Resolver**: Locates views, layouts, includes and components by name
//! - **Compiler**: Turns template source into a [`CompiledTemplate`]
//! - **Cache**: Stores compiled templates keyed by the hash of their source
//! - **Renderer**: Executes compiled nodes against a data context
//!
//! # Thread Safety
//!
//! `Engine` is `Send + Sync` and every method takes `&self`, so one engine
//! can serve concurrent renders.

use crate::cache::{generate_cache_key, Cache, MemoryCache};
use crate::compiler::{compile_template, CompiledTemplate};
use crate::component::ComponentRegistry;
use crate::config::EngineConfig;
use crate::error::{FluxError, Result};
use crate::renderer;
use crate::resolver::ResourceResolver;
use crate::value::{self, html_escaper, Escaper};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

#[cfg(feature = "filesystem")]
use crate::cache::FileSystemCache;

/// Ordered name to value mapping supplied to a render call.
pub type Context = Map<String, Value>;

/// Answers "is the current user authenticated?" for `@auth` and `@guest`.
pub trait AuthCheck: Send + Sync {
    /// Returns true when a user is signed in.
    fn is_authenticated(&self) -> bool;
}

impl<F> AuthCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_authenticated(&self) -> bool {
        self()
    }
}

/// Converts any serializable value into a render context.
///
/// `null` (e.g. `()`) becomes an empty context.
///
/// # Errors
///
/// Returns [`FluxError::ConfigError`] when the value does not serialize to a map.
pub fn to_context<T: Serialize + ?Sized>(data: &T) -> Result<Context> {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Context::new()),
        Ok(other) => Err(FluxError::ConfigError(format!(
            "render data must be a map, got {}",
            value::type_name(&other)
        ))),
        Err(e) => Err(FluxError::ConfigError(format!("render data cannot be serialized: {}", e))),
    }
}

/// Main Flux template engine.
///
/// The engine is generic over the resource resolver type `R`, allowing
/// different template loading strategies (filesystem, memory, database, etc.).
///
/// # Examples
///
/// ```rust
/// use flux_view::{Engine, MemoryCache, MemoryResourceResolver};
///
/// let resolver = MemoryResourceResolver::new();
/// resolver.add_resource("hello", "<h1>Hello, {{ name }}!</h1>");
///
/// let engine = Engine::new(resolver, Box::new(MemoryCache::new(100)));
/// let mut context = flux_view::Context::new();
/// context.insert("name".into(), "World".into());
/// assert_eq!(engine.render("hello", &context)?, "<h1>Hello, World!</h1>");
/// # Ok::<(), flux_view::FluxError>(())
/// ```
pub struct Engine<R: ResourceResolver> {
    resolver: R,
    cache: Box<dyn Cache>,
    config: EngineConfig,
    components: ComponentRegistry,
    auth: Arc<dyn AuthCheck>,
    escaper: Escaper,
}

impl<R: ResourceResolver> Engine<R> {
    /// Creates an engine with the default configuration.
    ///
    /// Nobody is authenticated and `{{ }}` output is HTML-escaped until
    /// [`with_auth`](Self::with_auth) or [`with_escaper`](Self::with_escaper)
    /// say otherwise.
    pub fn new(resolver: R, cache: Box<dyn Cache>) -> Self {
        Self {
            resolver,
            cache,
            config: EngineConfig::default(),
            components: ComponentRegistry::new(),
            auth: Arc::new(|| false),
            escaper: html_escaper(),
        }
    }

    /// Creates an engine backed by an in-memory LRU cache.
    ///
    /// # Errors
    ///
    /// Returns [`FluxError::ConfigError`] when `cache_size` is zero.
    pub fn with_memory_cache(resolver: R, cache_size: usize) -> Result<Self> {
        if cache_size == 0 {
            return Err(FluxError::ConfigError("cache size must be at least 1".to_string()));
        }
        Ok(Self::new(resolver, Box::new(MemoryCache::new(cache_size))))
    }

    /// Creates an engine whose compiled templates are also persisted to disk.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Resource resolver for loading template sources
    /// * `cache_dir` - Directory for the cached templates
    /// * `memory_size` - Size of the in-memory LRU cache in front of the disk
    #[cfg(feature = "filesystem")]
    pub fn with_filesystem_cache<P: AsRef<std::path::Path>>(
        resolver: R,
        cache_dir: P,
        memory_size: usize,
    ) -> Result<Self> {
        let cache = Box::new(FileSystemCache::new(cache_dir, memory_size)?);
        Ok(Self::new(resolver, cache))
    }

    /// Creates an engine from a configuration, sizing the memory cache from it.
    pub fn from_config(resolver: R, config: EngineConfig) -> Result<Self> {
        Self::with_memory_cache(resolver, config.cache_capacity)?.with_config(config)
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FluxError::ConfigError`] when the configuration is invalid.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Sets the predicate consulted by `@auth` and `@guest`.
    pub fn with_auth<A: AuthCheck + 'static>(mut self, auth: A) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Sets the function applied to `{{ }}` output.
    pub fn with_escaper<F>(mut self, escaper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.escaper = Arc::new(escaper);
        self
    }

    /// Registers a component callback, replacing any file component of the same name.
    pub fn register_component<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&Context, &str) -> String + Send + Sync + 'static,
    {
        self.components.register(name, callback);
    }

    /// The component registry.
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Returns a reference to the resource resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn escape(&self, text: &str) -> String {
        (self.escaper)(text)
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    // ============================================================================
    // Compilation
    // ============================================================================

    /// Compiles template source, reusing the cached result for identical text.
    pub fn compile(&self, source: &str) -> Result<Arc<CompiledTemplate>> {
        self.compile_named(source, None)
    }

    /// Like [`compile`](Self::compile), labelling syntax errors with `name`.
    pub fn compile_named(&self, source: &str, name: Option<&str>) -> Result<Arc<CompiledTemplate>> {
        let key = generate_cache_key(source);

        if let Some(hit) = self.cache.get(&key)? {
            trace!(template = name.unwrap_or("<inline>"), "compiled template cache hit");
            return Ok(hit);
        }

        let compiled = Arc::new(compile_template(source, name)?);
        self.cache.set(&key, Arc::clone(&compiled))?;
        Ok(compiled)
    }

    /// Resolves a named template and compiles it.
    ///
    /// # Errors
    ///
    /// Returns [`FluxError::TemplateNotFound`] when the resolver has no such
    /// template, or a syntax error from compilation.
    pub fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>> {
        let resource = self.resolver.resolve(name)?;
        debug!(template = name, path = %resource.path, "loaded template");
        self.compile_named(&resource.source, Some(name))
    }

    // ============================================================================
    // Rendering
    // ============================================================================

    /// Renders a named view.
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        let template = self.load(name)?;
        renderer::render_template(self, &template, name, context, 0, None)
    }

    /// Renders a named view with any serializable data.
    pub fn render_with<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String> {
        self.render(name, &to_context(data)?)
    }

    /// Renders template source directly.
    ///
    /// `@extends`, `@include` and components still go through the resolver.
    pub fn render_string(&self, source: &str, context: &Context) -> Result<String> {
        let template = self.compile(source)?;
        self.render_compiled(&template, context)
    }

    /// Renders an already compiled template.
    pub fn render_compiled(&self, template: &CompiledTemplate, context: &Context) -> Result<String> {
        renderer::render_template(self, template, "<inline>", context, 0, None)
    }

    // ============================================================================
    // Cache Management
    // ============================================================================

    /// Checks whether the compiled form of `source` is cached.
    pub fn cache_contains(&self, source: &str) -> bool {
        self.cache.contains_key(&generate_cache_key(source))
    }

    /// Clears all cached compiled templates.
    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }
}

impl<R: ResourceResolver> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoOpCache;
    use crate::memory_resolver::MemoryResourceResolver;
    use serde_json::json;

    fn engine() -> Engine<MemoryResourceResolver> {
        Engine::with_memory_cache(MemoryResourceResolver::new(), 16).unwrap()
    }

    #[test]
    fn test_compile_uses_cache() {
        let engine = engine();
        let first = engine.compile("Hello {{ name }}").unwrap();
        let second = engine.compile("Hello {{ name }}").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(engine.cache_contains("Hello {{ name }}"));

        engine.clear_cache().unwrap();
        assert!(!engine.cache_contains("Hello {{ name }}"));
    }

    #[test]
    fn test_noop_cache_still_compiles() {
        let engine = Engine::new(MemoryResourceResolver::new(), Box::new(NoOpCache::new()));
        let first = engine.compile("x").unwrap();
        let second = engine.compile("x").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_cache_size_is_rejected() {
        let result = Engine::with_memory_cache(MemoryResourceResolver::new(), 0);
        assert!(matches!(result, Err(FluxError::ConfigError(_))));
    }

    #[test]
    fn test_to_context() {
        let context = to_context(&json!({ "a": 1 })).unwrap();
        assert_eq!(context.get("a"), Some(&json!(1)));
        assert!(to_context(&()).unwrap().is_empty());
        assert!(matches!(to_context(&[1, 2]), Err(FluxError::ConfigError(_))));
    }

    #[test]
    fn test_auth_closure() {
        assert!(!engine().is_authenticated());
        assert!(engine().with_auth(|| true).is_authenticated());
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine<MemoryResourceResolver>>();
    }
}
