// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Engine configuration.
//!
//! [`EngineConfig`] can be built in code or deserialized, e.g. from the
//! `[engine]` table of a `flux.toml`:
//!
//! ```toml
//! [engine]
//! mode = "strict"
//! strict_components = true
//! max_depth = 16
//! max_loop_iterations = 5000
//! cache_capacity = 256
//! component_namespace = "components"
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::error::{FluxError, Result};
use serde::{Deserialize, Serialize};

/// How undefined variables and members are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Undefined values evaluate to `null`.
    #[default]
    Lenient,
    /// Undefined values fail with [`FluxError::ExpressionError`].
    Strict,
}

/// Runtime settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Expression evaluation mode (default: lenient).
    #[serde(default)]
    pub mode: EvaluationMode,

    /// Fail with `TemplateNotFound` instead of emitting a marker comment
    /// when a component cannot be resolved (default: false).
    #[serde(default)]
    pub strict_components: bool,

    /// Maximum nesting of includes, components and layouts (default: 32).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum iterations of a single `@for` or `@while` loop (default: 10000).
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,

    /// Entries kept by the in-memory compiled-template cache (default: 128).
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Prefix used to locate file components (default: "components").
    #[serde(default = "default_component_namespace")]
    pub component_namespace: String,
}

fn default_max_depth() -> usize {
    32
}

fn default_max_loop_iterations() -> usize {
    10_000
}

fn default_cache_capacity() -> usize {
    128
}

fn default_component_namespace() -> String {
    "components".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::default(),
            strict_components: false,
            max_depth: default_max_depth(),
            max_loop_iterations: default_max_loop_iterations(),
            cache_capacity: default_cache_capacity(),
            component_namespace: default_component_namespace(),
        }
    }
}

impl EngineConfig {
    /// Returns a copy with strict evaluation enabled.
    pub fn strict() -> Self {
        Self {
            mode: EvaluationMode::Strict,
            strict_components: true,
            ..Self::default()
        }
    }

    /// Checks that the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`FluxError::ConfigError`] for a zero depth or loop limit.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(FluxError::ConfigError("max_depth must be at least 1".to_string()));
        }
        if self.max_loop_iterations == 0 {
            return Err(FluxError::ConfigError("max_loop_iterations must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.mode, EvaluationMode::Lenient);
        assert!(!config.strict_components);
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.max_loop_iterations, 10_000);
        assert_eq!(config.component_namespace, "components");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"mode": "strict", "max_depth": 4}"#).unwrap();
        assert_eq!(config.mode, EvaluationMode::Strict);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_loop_iterations, 10_000);
        assert_eq!(config.cache_capacity, 128);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = EngineConfig { max_depth: 0, ..EngineConfig::default() };
        assert!(matches!(config.validate(), Err(FluxError::ConfigError(_))));

        let config = EngineConfig { max_loop_iterations: 0, ..EngineConfig::default() };
        assert!(matches!(config.validate(), Err(FluxError::ConfigError(_))));
    }
}
