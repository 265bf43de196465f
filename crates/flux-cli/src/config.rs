// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Flux project configuration.
//!
//! Configuration is loaded from `flux.toml` at the project root.
//!
//! # Example Configuration
//!
//! ```toml
//! [views]
//! dir = "app/Views"
//! extensions = ["flux", "html"]
//!
//! [engine]
//! mode = "strict"
//! strict_components = true
//! max_depth = 16
//! ```

use flux_view::EngineConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "flux.toml";

/// Main configuration structure loaded from `flux.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Where views live.
    #[serde(default)]
    pub views: ViewsConfig,
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Views directory configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ViewsConfig {
    /// Directory containing templates (default: "app/Views").
    #[serde(default = "default_views_dir")]
    pub dir: String,

    /// Extensions tried for names without one (default: ["flux", "html"]).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_views_dir() -> String {
    "app/Views".to_string()
}

fn default_extensions() -> Vec<String> {
    flux_view::DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            dir: default_views_dir(),
            extensions: default_extensions(),
        }
    }
}

impl Config {
    /// Loads configuration from `flux.toml` in the current directory.
    ///
    /// If no configuration file exists, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads configuration from an explicit path, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// The views directory, overridden by `--views` when given.
    pub fn views_dir(&self, override_dir: Option<&str>) -> String {
        override_dir.map(str::to_string).unwrap_or_else(|| self.views.dir.clone())
    }
}
