// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Component support: attribute parsing and the callback registry.
//!
//! A component tag `<x-name attr="v">slot</x-name>` is resolved by the
//! renderer in two steps: a callback registered under the exact name wins,
//! otherwise the template `<namespace>.<name>` is loaded through the
//! resolver. This module owns the first step.

use crate::engine::Context;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

lazy_static! {
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"([A-Za-z0-9_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern is valid");
}

/// Parses component attributes into `(name, value)` pairs in source order.
///
/// Only quoted string values are recognised; values are never evaluated.
/// A repeated attribute keeps its first position and its last value.
pub fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();

    for caps in ATTRIBUTE.captures_iter(raw) {
        let name = caps[1].to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        match attributes.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => attributes.push((name, value)),
        }
    }

    attributes
}

/// A component implemented in Rust.
///
/// Receives the component data (caller scope, attributes, `slot` and
/// `attributes`) and the rendered slot, and returns the component's HTML.
pub type ComponentCallback = Arc<dyn Fn(&Context, &str) -> String + Send + Sync>;

/// Thread-safe registry of component callbacks.
///
/// Cloning is cheap and clones share the same registrations.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    inner: Arc<RwLock<HashMap<String, ComponentCallback>>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback, replacing any previous one with the same name.
    pub fn register<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&Context, &str) -> String + Send + Sync + 'static,
    {
        self.write().insert(name.into(), Arc::new(callback));
    }

    /// Returns the callback registered under `name`.
    pub fn get(&self, name: &str) -> Option<ComponentCallback> {
        self.read().get(name).cloned()
    }

    /// Returns true when a callback is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Removes a registration. Returns true if one existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    // A panic inside a callback cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ComponentCallback>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ComponentCallback>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_parse_attributes_in_order() {
        let attrs = parse_attributes(r#"type="error" title='Oops' data-id="7""#);
        assert_eq!(
            attrs,
            vec![
                ("type".to_string(), "error".to_string()),
                ("title".to_string(), "Oops".to_string()),
                ("data-id".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_attributes_edge_cases() {
        assert!(parse_attributes("").is_empty());
        assert!(parse_attributes("disabled").is_empty());
        assert_eq!(parse_attributes(r#"a = "1" a="2""#), vec![("a".to_string(), "2".to_string())]);
        assert_eq!(parse_attributes(r#"label="it's""#), vec![("label".to_string(), "it's".to_string())]);
    }

    #[test]
    fn test_registry_register_and_call() {
        let registry = ComponentRegistry::new();
        registry.register("badge", |data: &Context, slot: &str| {
            let color = data.get("color").and_then(Value::as_str).unwrap_or("grey");
            format!("<span class=\"{}\">{}</span>", color, slot)
        });

        let mut data = Context::new();
        data.insert("color".into(), Value::from("red"));
        let callback = registry.get("badge").unwrap();

        assert_eq!(callback(&data, "New"), "<span class=\"red\">New</span>");
        assert!(registry.contains("badge"));
        assert!(registry.get("Badge").is_none());
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = ComponentRegistry::new();
        let clone = registry.clone();
        clone.register("b", |_: &Context, _: &str| String::new());
        clone.register("a", |_: &Context, _: &str| String::new());

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.unregister("a"));
        assert!(!clone.unregister("a"));
    }
}
