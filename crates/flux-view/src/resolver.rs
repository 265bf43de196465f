// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template resource resolution.
//!
//! This module provides the [`ResourceResolver`] trait and the filesystem
//! implementation used to locate views, layouts, includes and component
//! templates.
//!
//! # Resolver Implementations
//!
//! - [`FileSystemResolver`]: Loads templates from a views directory
//! - [`MemoryResourceResolver`](crate::MemoryResourceResolver): Loads templates from memory (tests, embedding)
//!
//! # Naming
//!
//! Templates are addressed by dotted logical names. `auth.register`
//! resolves to `auth/register.flux`, falling back to each further configured
//! extension (`auth/register.html`). A name that already ends in a known
//! extension (`emails.welcome.html`) is used as written. `.php` files are
//! not tried unless configured; they hold host code, not Flux templates.
//!
//! # Custom Resolvers
//!
//! Implement [`ResourceResolver`] for custom loading strategies (database,
//! embedded assets, etc.).

use crate::error::{FluxError, Result};
use std::path::Path;

#[cfg(feature = "filesystem")]
use std::fs;

/// Extensions tried when a name has none.
pub const DEFAULT_EXTENSIONS: &[&str] = &["flux", "html"];

/// Converts a Path to a string with forward slashes.
#[inline]
pub fn path_to_string<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// A resolved template resource with its path and source code.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    /// Where the template was found (canonical path, or the memory key).
    pub path: String,
    /// The template source code.
    pub source: String,
}

/// Trait for resolving and loading template resources.
///
/// Implementations must be thread-safe; an engine may be shared between
/// request handlers.
pub trait ResourceResolver: Send + Sync + 'static {
    /// Resolves a logical template name and returns its source.
    ///
    /// # Errors
    ///
    /// Returns [`FluxError::TemplateNotFound`] when no template exists under
    /// the name.
    fn resolve(&self, name: &str) -> Result<ResolvedResource>;

    /// Returns true when `name` resolves.
    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }
}

/// Returns the relative paths tried for a logical name, in order.
///
/// Dots become directory separators, leading slashes and empty segments are
/// dropped, and a trailing known extension is kept as the only candidate.
pub fn candidate_paths<S: AsRef<str>>(name: &str, extensions: &[S]) -> Vec<String> {
    let name = name.trim();
    let explicit = extensions.iter().map(AsRef::as_ref).find(|ext| {
        name.len() > ext.len() + 1 && name.ends_with(ext) && name[..name.len() - ext.len()].ends_with('.')
    });

    let stem = match explicit {
        Some(ext) => &name[..name.len() - ext.len() - 1],
        None => name,
    };
    let stem = stem
        .split(['.', '/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if stem.is_empty() {
        return Vec::new();
    }

    match explicit {
        Some(ext) => vec![format!("{}.{}", stem, ext)],
        None => extensions
            .iter()
            .map(|ext| format!("{}.{}", stem, ext.as_ref()))
            .collect(),
    }
}

/// Filesystem-based resource resolver.
///
/// Loads templates relative to a root directory (Flux apps use `app/Views`).
/// Resolved paths are canonicalized and must stay inside the root, so
/// symlinks cannot reach outside it.
///
/// # Examples
///
/// ```rust,no_run
/// use flux_view::{FileSystemResolver, ResourceResolver};
///
/// let resolver = FileSystemResolver::new("app/Views");
/// let page = resolver.resolve("auth.register")?;
/// # Ok::<(), flux_view::FluxError>(())
/// ```
#[cfg(feature = "filesystem")]
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    /// The root directory for template resolution.
    pub root_dir: String,
    /// Extensions tried, in order, for names without one.
    pub extensions: Vec<String>,
}

#[cfg(feature = "filesystem")]
impl FileSystemResolver {
    /// Creates a resolver rooted at `root_dir` with the default extensions.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Self {
            root_dir: path_to_string(root_dir.as_ref()),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Replaces the list of extensions tried for bare names.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    fn resolve_path(&self, name: &str) -> Result<std::path::PathBuf> {
        let root = Path::new(&self.root_dir);
        let found = candidate_paths(name, &self.extensions)
            .into_iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.is_file());

        tracing::debug!("Resolved path for '{}': {:?}", name, found);

        let path = found.ok_or_else(|| FluxError::TemplateNotFound(name.to_string()))?;
        let canonical_path = fs::canonicalize(&path)?;
        let canonical_root = fs::canonicalize(root)?;

        if !canonical_path.starts_with(&canonical_root) {
            tracing::warn!("Template '{}' resolves outside of '{}'", name, self.root_dir);
            return Err(FluxError::TemplateNotFound(name.to_string()));
        }

        Ok(canonical_path)
    }
}

#[cfg(feature = "filesystem")]
impl ResourceResolver for FileSystemResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedResource> {
        let path = self.resolve_path(name)?;
        let source = fs::read_to_string(&path)?;
        Ok(ResolvedResource {
            path: path_to_string(&path),
            source,
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve_path(name).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_paths() {
        assert_eq!(
            candidate_paths("auth.register", DEFAULT_EXTENSIONS),
            vec!["auth/register.flux", "auth/register.html"]
        );
        assert_eq!(candidate_paths("emails.welcome.html", DEFAULT_EXTENSIONS), vec!["emails/welcome.html"]);
        assert_eq!(candidate_paths("/layouts/app", DEFAULT_EXTENSIONS), vec!["layouts/app.flux", "layouts/app.html"]);
        assert_eq!(candidate_paths("../../etc/passwd", &["flux"]), vec!["etc/passwd.flux"]);
        assert!(candidate_paths(" . ", DEFAULT_EXTENSIONS).is_empty());
        assert_eq!(candidate_paths("flux", DEFAULT_EXTENSIONS), vec!["flux.flux", "flux.html"]);
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_filesystem_resolver_dotted_names() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("auth")).unwrap();
        std::fs::write(dir.path().join("auth/register.flux"), "register").unwrap();
        std::fs::write(dir.path().join("about.html"), "about").unwrap();

        let resolver = FileSystemResolver::new(dir.path());
        assert_eq!(resolver.resolve("auth.register").unwrap().source, "register");
        assert_eq!(resolver.resolve("about").unwrap().source, "about");
        assert_eq!(resolver.resolve("about.html").unwrap().source, "about");
        assert!(resolver.resolve("auth/register.flux").unwrap().path.ends_with("auth/register.flux"));
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_php_views_are_not_a_default_fallback() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("legacy.php"), "<?php echo 1; ?>").unwrap();

        let resolver = FileSystemResolver::new(dir.path());
        assert!(matches!(resolver.resolve("legacy"), Err(FluxError::TemplateNotFound(_))));

        let resolver = FileSystemResolver::new(dir.path()).with_extensions(["flux", "php"]);
        assert_eq!(resolver.resolve("legacy").unwrap().source, "<?php echo 1; ?>");
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_filesystem_resolver_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = FileSystemResolver::new(dir.path());

        assert!(matches!(resolver.resolve("nope"), Err(FluxError::TemplateNotFound(name)) if name == "nope"));
        assert!(!resolver.exists("nope"));
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_filesystem_resolver_custom_extensions() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("page.blade.php"), "legacy").unwrap();
        std::fs::write(dir.path().join("page.flux"), "flux").unwrap();

        let resolver = FileSystemResolver::new(dir.path()).with_extensions([".tpl", "flux"]);
        assert_eq!(resolver.resolve("page").unwrap().source, "flux");
    }

    #[cfg(all(unix, feature = "filesystem"))]
    #[test]
    fn test_filesystem_resolver_rejects_symlink_escape() {
        let outside = tempfile::TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.flux"), "secret").unwrap();

        let root = tempfile::TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.flux"), root.path().join("leak.flux")).unwrap();

        let resolver = FileSystemResolver::new(root.path());
        assert!(matches!(resolver.resolve("leak"), Err(FluxError::TemplateNotFound(_))));
    }
}
