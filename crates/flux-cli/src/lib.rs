// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! Flux CLI library.
//!
//! This crate provides the command-line interface for the Flux view engine.
//!
//! # Usage
//!
//! This crate is primarily used through the `flux` binary:
//!
//! ```bash
//! flux render auth.register --data data.json   # Render a view
//! flux check --views app/Views                  # Report syntax errors
//! ```
//!
//! # Configuration
//!
//! Projects are configured via an optional `flux.toml` at the project root.

/// CLI commands (render, check).
pub mod commands;
/// Project configuration from `flux.toml`.
pub mod config;
