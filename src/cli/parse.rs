// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Parse command - show the parsed pipeline

use miette::Result;

use super::OutputFormat;
use crate::pipeline::Pipeline;
use crate::utils::report;

/// Print how an expression is parsed
pub async fn run(expression: String, format: OutputFormat) -> Result<()> {
    let pipeline = Pipeline::parse(&expression)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&pipeline)
                .map_err(|e| miette::miette!("Failed to serialize pipeline: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", report::render_pipeline(&pipeline)),
    }

    Ok(())
}
