// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::error::{FluxError, Result};
use crate::resolver::{candidate_paths, ResolvedResource, ResourceResolver, DEFAULT_EXTENSIONS};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Memory-based resource resolver that stores templates in memory.
///
/// Names follow the same policy as the filesystem resolver, so
/// `add_template("layouts.app", ..)` and `add_template("layouts/app.flux", ..)`
/// store the same entry and both `resolve("layouts.app")` and
/// `resolve("layouts/app.flux")` find it.
#[derive(Debug, Clone)]
pub struct MemoryResourceResolver {
    templates: Arc<RwLock<HashMap<String, String>>>,
    extensions: Vec<String>,
}

impl Default for MemoryResourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResourceResolver {
    /// Create a new memory resource resolver
    pub fn new() -> Self {
        Self {
            templates: Arc::new(RwLock::new(HashMap::new())),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.templates.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.templates.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The storage key for a name: its first candidate path.
    fn key(&self, name: &str) -> Option<String> {
        candidate_paths(name, &self.extensions).into_iter().next()
    }

    /// Add a template to the memory resolver
    pub fn add_template(&self, name: &str, content: String) {
        match self.key(name) {
            Some(key) => {
                self.write().insert(key, content);
            }
            None => tracing::warn!("Ignoring template with empty name"),
        }
    }

    /// Add a resource from a borrowed string
    pub fn add_resource(&self, name: &str, content: &str) {
        self.add_template(name, content.to_string());
    }

    /// Remove a template from the memory resolver
    pub fn remove_template(&self, name: &str) {
        if let Some(key) = self.key(name) {
            self.write().remove(&key);
        }
    }

    /// Clear all templates
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Stored keys, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ResourceResolver for MemoryResourceResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedResource> {
        let templates = self.read();
        candidate_paths(name, &self.extensions)
            .into_iter()
            .find_map(|path| {
                templates.get(&path).map(|source| ResolvedResource {
                    source: source.clone(),
                    path,
                })
            })
            .ok_or_else(|| FluxError::TemplateNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_resolver_direct() {
        let resolver = MemoryResourceResolver::new();
        resolver.add_template("welcome", "<div>Hello</div>".to_string());

        let resolved = resolver.resolve("welcome").unwrap();
        assert_eq!(resolved.path, "welcome.flux");
        assert_eq!(resolved.source, "<div>Hello</div>");

        assert_eq!(resolver.resolve("welcome.flux").unwrap().source, "<div>Hello</div>");
        assert!(matches!(resolver.resolve("nonexistent"), Err(FluxError::TemplateNotFound(_))));
    }

    #[test]
    fn test_memory_resolver_dotted_and_slashed_names_agree() {
        let resolver = MemoryResourceResolver::new();
        resolver.add_resource("layouts/app.flux", "layout");

        assert_eq!(resolver.resolve("layouts.app").unwrap().source, "layout");
        assert_eq!(resolver.resolve("/layouts/app").unwrap().path, "layouts/app.flux");
    }

    #[test]
    fn test_memory_resolver_extension_fallback() {
        let resolver = MemoryResourceResolver::new();
        resolver.add_resource("emails.welcome.html", "<p>Hi</p>");

        let resolved = resolver.resolve("emails.welcome").unwrap();
        assert_eq!(resolved.path, "emails/welcome.html");
        assert!(resolver.exists("emails.welcome"));
    }

    #[test]
    fn test_memory_resolver_add_remove_clear() {
        let resolver = MemoryResourceResolver::new();
        resolver.add_template("temp", "test".to_string());
        assert!(resolver.resolve("temp").is_ok());

        resolver.remove_template("temp.flux");
        assert!(resolver.resolve("temp").is_err());

        resolver.add_resource("temp1", "test1");
        resolver.add_resource("temp2", "test2");
        assert_eq!(resolver.names(), vec!["temp1.flux", "temp2.flux"]);
        resolver.clear();
        assert!(resolver.resolve("temp1").is_err());
        assert!(resolver.resolve("temp2").is_err());
    }

    #[test]
    fn test_clones_share_templates() {
        let resolver = MemoryResourceResolver::new();
        let clone = resolver.clone();
        clone.add_resource("shared", "x");
        assert!(resolver.exists("shared"));
    }
}
