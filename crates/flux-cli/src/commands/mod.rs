// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `render`: Render a view against a JSON data file
//! - `check`: Compile every template under the views directory

/// Template syntax check command.
pub mod check;
/// View render command.
pub mod render;

use crate::config::Config;
use flux_view::{Engine, FileSystemResolver};
use std::path::Path;

/// Builds an engine over `views_dir` using the configured extensions and engine settings.
pub fn build_engine(config: &Config, views_dir: &str) -> anyhow::Result<Engine<FileSystemResolver>> {
    if !Path::new(views_dir).is_dir() {
        anyhow::bail!("Views directory '{}' does not exist", views_dir);
    }

    let resolver = FileSystemResolver::new(views_dir).with_extensions(config.views.extensions.iter().cloned());
    Ok(Engine::from_config(resolver, config.engine.clone())?)
}
