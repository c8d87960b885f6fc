// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Handlers command - list registered stage types

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::{load_registry, OutputFormat};
use crate::utils::print_header;

/// List registered stage types
pub async fn run(format: OutputFormat, config: Option<&Path>) -> Result<()> {
    let registry = load_registry(config)?;
    let handlers = registry.describe();

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = handlers
                .iter()
                .map(|(name, description)| serde_json::json!({ "type": name, "description": description }))
                .collect();
            let json = serde_json::to_string_pretty(&entries)
                .map_err(|e| miette::miette!("Failed to serialize handlers: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            print_header("Stage types");
            let width = handlers.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
            for (name, description) in &handlers {
                let padded = format!("{:width$}", name, width = width);
                println!("  {}  {}", padded.bold(), description.dimmed());
            }
        }
    }

    Ok(())
}
