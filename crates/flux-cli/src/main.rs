// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use flux_cli::{commands, config::Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flux")]
#[command(version)]
#[command(about = "Render and check Blade-style Flux templates", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = flux_cli::config::CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a view and print it to stdout
    Render {
        /// Dotted view name, e.g. auth.register
        view: String,
        /// JSON file with the data context
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Views directory (overrides flux.toml)
        #[arg(long)]
        views: Option<String>,
    },
    /// Compile every template and report syntax errors
    Check {
        /// Views directory (overrides flux.toml)
        #[arg(long)]
        views: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_from(&cli.config)?;

    match cli.command {
        Commands::Render { view, data, views } => {
            let html = commands::render::run(&config, &view, data.as_deref(), views.as_deref())?;
            print!("{}", html);
            Ok(())
        }
        Commands::Check { views } => {
            let report = commands::check::run(&config, views.as_deref())?;
            if !report.is_ok() {
                anyhow::bail!("{} of {} templates failed to compile", report.failures.len(), report.checked);
            }
            Ok(())
        }
    }
}
