// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! stagepipe - inline pipeline runner
//!
//! Parse `stage --flag value | stage ...` expressions and run them.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagepipe::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "stagepipe=debug"
    } else {
        "stagepipe=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    stagepipe::utils::configure_colors();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = cli.config.as_deref();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            expression,
            format,
            timeout,
        } => stagepipe::cli::run::run(expression, format, timeout, config, cli.verbose).await,
        Commands::Parse { expression, format } => {
            stagepipe::cli::parse::run(expression, format).await
        }
        Commands::Check { expression } => {
            stagepipe::cli::check::run(expression, config, cli.verbose).await
        }
        Commands::Handlers { format } => stagepipe::cli::handlers::run(format, config).await,
    }
}
