// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for stagepipe.

pub mod check;
pub mod handlers;
pub mod parse;
pub mod run;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::handlers::{create_default_registry, HandlerRegistry};

/// Inline pipeline runner
///
/// Run `stage --flag value | stage --flag "{{stage}}"` expressions.
#[derive(Parser, Debug)]
#[clap(
    name = "stagepipe",
    version,
    about = "Parse and run inline stage pipelines",
    long_about = None,
    after_help = "Examples:\n\
        stagepipe run 'shell --command \"date\" | echo --text \"Now: {{shell}}\"'\n\
        stagepipe parse 'fetch --url http://x | analyze --prompt \"{{fetch}}\"'\n\
        stagepipe check 'read --path notes.md | summarize --text \"{{read}}\"'\n\
        stagepipe handlers                List registered stage types\n\n\
        See 'stagepipe <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Settings file (default: .stagepipe.yaml, then the user config)
    #[clap(long, global = true, value_name = "FILE", env = "STAGEPIPE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and execute a pipeline expression
    Run {
        /// Pipeline expression
        expression: String,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Abort the whole run after this many seconds
        #[clap(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Show how an expression is parsed
    Parse {
        /// Pipeline expression
        expression: String,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check an expression against the registered handlers without running it
    Check {
        /// Pipeline expression
        expression: String,
    },

    /// List registered stage types
    Handlers {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load settings and build the handler registry
pub fn load_registry(config: Option<&Path>) -> Result<HandlerRegistry> {
    let settings = match config {
        Some(path) => Settings::load_required(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
            Settings::discover(&cwd)?
        }
    };

    Ok(create_default_registry(&settings))
}
