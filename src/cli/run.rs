// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Run command - parse and execute an expression

use colored::Colorize;
use miette::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{load_registry, OutputFormat};
use crate::errors::{RecoverySuggestion, StagepipeError};
use crate::pipeline::{ExecutionOptions, Pipeline, PipelineExecutor};
use crate::utils::{print_section, report};

/// Run the pipeline
pub async fn run(
    expression: String,
    format: OutputFormat,
    timeout: Option<u64>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let registry = Arc::new(load_registry(config)?);
    let available = registry.stage_types();

    let pipeline = Pipeline::parse(&expression).map_err(|e| {
        suggest(&e, &available);
        e
    })?;

    let options = ExecutionOptions {
        show_progress: format == OutputFormat::Text,
    };
    let executor = PipelineExecutor::new(registry).with_options(options);

    let execution = executor.execute(&pipeline);
    let result = match timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), execution)
            .await
            .map_err(|_| miette::miette!("Pipeline '{}' timed out after {}s", pipeline.name, secs))?,
        None => execution.await,
    };

    let result = result.map_err(|e| {
        suggest(&e, &available);
        e
    })?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| miette::miette!("Failed to serialize result: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            if verbose || !result.succeeded {
                print_section("Stages");
                print!("{}", report::render_result(&result));
            } else if let Some(output) = result.final_output() {
                print_section("Output");
                println!("{}", crate::pipeline::template::render_output(output));
            }
        }
    }

    if let Some(failure) = result.failure() {
        let stage_type = result
            .stages
            .get(failure.stage_index)
            .map(|s| s.stage_type.as_str())
            .unwrap_or_default();
        let error = failure.to_error(stage_type);

        if format == OutputFormat::Text {
            suggest(&error, &available);
        }

        return Err(error.into());
    }

    Ok(())
}

fn suggest(error: &StagepipeError, available: &[String]) {
    if let Some(suggestion) = RecoverySuggestion::for_error(error, available) {
        eprintln!();
        eprintln!("{}", suggestion.to_string().dimmed());
    }
}
