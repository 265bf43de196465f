// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render command: renders one view to a string.

use super::build_engine;
use crate::config::Config;
use anyhow::Context as _;
use flux_view::{to_context, Context};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Renders `view` from the views directory with the data in `data_file`.
pub fn run(config: &Config, view: &str, data_file: Option<&Path>, views: Option<&str>) -> anyhow::Result<String> {
    let views_dir = config.views_dir(views);
    let engine = build_engine(config, &views_dir)?;
    let context = load_data(data_file)?;

    tracing::info!("Rendering '{}' from {}", view, views_dir);
    Ok(engine.render(view, &context)?)
}

/// Reads a JSON object from `path`; no path means an empty context.
pub fn load_data(path: Option<&Path>) -> anyhow::Result<Context> {
    let Some(path) = path else {
        return Ok(Context::new());
    };

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read data file {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(to_context(&value)?)
}
