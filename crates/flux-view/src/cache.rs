// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiled template caching.
//!
//! Templates are cached by the SHA-256 of their source text, so identical
//! source compiles once no matter which name it was loaded under, and an
//! edited file naturally misses.
//!
//! # Cache Implementations
//!
//! - [`MemoryCache`]: In-memory LRU cache (recommended for most uses)
//! - [`FileSystemCache`]: Persistent disk cache with a memory layer
//! - [`NoOpCache`]: Always compiles fresh
//!
//! Entries are `Arc<CompiledTemplate>` and immutable once stored. Two threads
//! compiling the same source at once store equal values, so the race is
//! harmless.
//!
//! # Custom Caches
//!
//! Implement the [`Cache`] trait to create custom caching strategies.

use crate::compiler::CompiledTemplate;
use crate::error::{FluxError, Result};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Trait for compiled template caches.
///
/// Implementations must be thread-safe.
pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Retrieves a template from the cache.
    fn get(&self, key: &str) -> Result<Option<Arc<CompiledTemplate>>>;
    /// Stores a template in the cache.
    fn set(&self, key: &str, template: Arc<CompiledTemplate>) -> Result<()>;
    /// Removes a template from the cache.
    fn remove(&self, key: &str) -> Result<()>;
    /// Clears all cached templates.
    fn clear(&self) -> Result<()>;
    /// Checks if a key exists in the cache.
    fn contains_key(&self, key: &str) -> bool;
    /// Creates a boxed clone sharing the same storage.
    fn clone_box(&self) -> Box<dyn Cache>;
}

impl Clone for Box<dyn Cache> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// In-memory LRU (Least Recently Used) cache.
///
/// # Examples
///
/// ```rust
/// use flux_view::{Cache, MemoryCache};
///
/// let cache = MemoryCache::new(100);
/// assert!(!cache.contains_key("missing"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<String, Arc<CompiledTemplate>>>>,
}

impl MemoryCache {
    /// Creates a new memory cache holding up to `capacity` templates.
    ///
    /// A capacity of zero is treated as one; the engine rejects zero before
    /// it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Arc<CompiledTemplate>>>> {
        self.cache
            .lock()
            .map_err(|_| FluxError::CacheError("Failed to acquire cache lock".to_string()))
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Arc<CompiledTemplate>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, template: Arc<CompiledTemplate>) -> Result<()> {
        self.lock()?.put(key.to_string(), template);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.pop(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.lock().map(|cache| cache.contains(key)).unwrap_or(false)
    }

    fn clone_box(&self) -> Box<dyn Cache> {
        Box::new(self.clone())
    }
}

/// No-op cache that never stores or retrieves anything.
///
/// Useful during template development, where every render should see the
/// latest source.
#[derive(Debug, Clone, Default)]
pub struct NoOpCache;

impl NoOpCache {
    /// Creates a new no-op cache.
    pub fn new() -> Self {
        Self
    }
}

impl Cache for NoOpCache {
    fn get(&self, _key: &str) -> Result<Option<Arc<CompiledTemplate>>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _template: Arc<CompiledTemplate>) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn contains_key(&self, _key: &str) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Cache> {
        Box::new(NoOpCache)
    }
}

/// Persistent filesystem-backed cache with memory layer.
///
/// Each template is stored as `<key>.json` holding the serialized
/// [`CompiledTemplate`]. Only available with the `filesystem` feature.
#[cfg(feature = "filesystem")]
#[derive(Debug, Clone)]
pub struct FileSystemCache {
    cache_dir: std::path::PathBuf,
    memory_cache: MemoryCache,
}

#[cfg(feature = "filesystem")]
impl FileSystemCache {
    /// Creates a new filesystem cache.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Directory for storing cache files
    /// * `memory_capacity` - Size of in-memory LRU layer
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new<P: AsRef<std::path::Path>>(cache_dir: P, memory_capacity: usize) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| FluxError::CacheError(format!("Failed to create cache directory: {}", e)))?;

        Ok(Self {
            cache_dir,
            memory_cache: MemoryCache::new(memory_capacity),
        })
    }

    fn cache_file_path(&self, key: &str) -> std::path::PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '.'], "_");
        self.cache_dir.join(format!("{}.json", safe_key))
    }
}

#[cfg(feature = "filesystem")]
impl Cache for FileSystemCache {
    fn get(&self, key: &str) -> Result<Option<Arc<CompiledTemplate>>> {
        if let Some(template) = self.memory_cache.get(key)? {
            return Ok(Some(template));
        }

        let cache_file = self.cache_file_path(key);
        if !cache_file.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&cache_file)
            .map_err(|e| FluxError::CacheError(format!("Failed to read cache file: {}", e)))?;

        let template: CompiledTemplate = match serde_json::from_str(&raw) {
            Ok(template) => template,
            Err(e) => {
                // A stale or truncated entry is treated as a miss and will be
                // overwritten by the next `set`.
                tracing::warn!(key, error = %e, "discarding unreadable cache entry");
                return Ok(None);
            }
        };

        let template = Arc::new(template);
        self.memory_cache.set(key, template.clone())?;
        Ok(Some(template))
    }

    fn set(&self, key: &str, template: Arc<CompiledTemplate>) -> Result<()> {
        self.memory_cache.set(key, template.clone())?;

        let encoded = serde_json::to_string(template.as_ref())
            .map_err(|e| FluxError::CacheError(format!("Failed to serialize template: {}", e)))?;
        std::fs::write(self.cache_file_path(key), encoded)
            .map_err(|e| FluxError::CacheError(format!("Failed to write cache file: {}", e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.memory_cache.remove(key)?;

        let cache_file = self.cache_file_path(key);
        if cache_file.exists() {
            std::fs::remove_file(&cache_file)
                .map_err(|e| FluxError::CacheError(format!("Failed to remove cache file: {}", e)))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.memory_cache.clear()?;

        let entries = std::fs::read_dir(&self.cache_dir)
            .map_err(|e| FluxError::CacheError(format!("Failed to read cache directory: {}", e)))?;

        for entry in entries {
            let entry = entry.map_err(|e| FluxError::CacheError(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)
                    .map_err(|e| FluxError::CacheError(format!("Failed to remove file: {}", e)))?;
            }
        }

        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.memory_cache.contains_key(key) || self.cache_file_path(key).exists()
    }

    fn clone_box(&self) -> Box<dyn Cache> {
        Box::new(self.clone())
    }
}

/// Generates the cache key for template source: lowercase hex SHA-256.
pub fn generate_cache_key(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_template;

    fn compiled(source: &str) -> Arc<CompiledTemplate> {
        Arc::new(compile_template(source, None).unwrap())
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new(10);
        let template = compiled("Hello {{ name }}");
        let key = template.hash.clone();

        cache.set(&key, template.clone()).unwrap();
        let retrieved = cache.get(&key).unwrap().unwrap();
        assert_eq!(retrieved, template);

        assert!(cache.contains_key(&key));
        assert!(!cache.contains_key("nonexistent"));

        cache.remove(&key).unwrap();
        assert!(!cache.contains_key(&key));
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_memory_cache_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.set("a", compiled("a")).unwrap();
        cache.set("b", compiled("b")).unwrap();
        cache.get("a").unwrap();
        cache.set("c", compiled("c")).unwrap();

        assert!(cache.contains_key("a"));
        assert!(!cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn test_clone_box_shares_storage() {
        let cache = MemoryCache::new(4);
        let boxed: Box<dyn Cache> = cache.clone_box();
        boxed.set("k", compiled("x")).unwrap();
        assert!(cache.contains_key("k"));
    }

    #[test]
    fn test_noop_cache() {
        let cache = NoOpCache::new();
        cache.set("k", compiled("x")).unwrap();
        assert!(cache.get("k").unwrap().is_none());
        assert!(!cache.contains_key("k"));
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_filesystem_cache() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cache = FileSystemCache::new(temp_dir.path(), 10).unwrap();
        let template = compiled("@extends('layout')@section('a'){{ x }}@endsection");
        let key = template.hash.clone();

        cache.set(&key, template.clone()).unwrap();
        assert!(cache.contains_key(&key));

        // Persistence: a fresh instance reads the file back.
        let cache2 = FileSystemCache::new(temp_dir.path(), 10).unwrap();
        let retrieved = cache2.get(&key).unwrap().unwrap();
        assert_eq!(retrieved.as_ref(), template.as_ref());

        cache2.clear().unwrap();
        assert!(!cache2.contains_key(&key));
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_filesystem_cache_ignores_corrupt_entries() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cache = FileSystemCache::new(temp_dir.path(), 10).unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), "{not json").unwrap();

        assert!(cache.get("broken").unwrap().is_none());
    }

    #[test]
    fn test_cache_key_generation() {
        let key1 = generate_cache_key("hello");
        let key2 = generate_cache_key("hello");
        let key3 = generate_cache_key("world");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_eq!(key1, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
    }
}
