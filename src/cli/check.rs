// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Check command - validate an expression without running it

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::load_registry;
use crate::pipeline::{Pipeline, PipelineValidator};
use crate::utils::{print_error, print_info, print_success, print_warning};

/// Run the check command
pub async fn run(expression: String, config: Option<&Path>, verbose: bool) -> Result<()> {
    println!("{}", "Checking pipeline...".bold());
    println!();

    let registry = load_registry(config)?;

    let pipeline = match Pipeline::parse(&expression) {
        Ok(p) => p,
        Err(e) => {
            print_error("Expression does not parse");
            println!();
            return Err(e.into());
        }
    };

    print_success(&format!(
        "Parsed {} stage{}",
        pipeline.stages.len(),
        if pipeline.stages.len() == 1 { "" } else { "s" }
    ));

    let validation = PipelineValidator::validate(&pipeline, &registry);

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            print_error(error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        print_info(&format!("Name: {}", pipeline.name));
        print_info(&format!("Stages: {}", pipeline.stage_types().join(" | ")));
    }

    println!();

    if validation.is_valid() {
        if validation.has_warnings() {
            println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        } else {
            println!("{}", "Pipeline is valid!".green().bold());
        }
        Ok(())
    } else {
        Err(miette::miette!("Pipeline validation failed"))
    }
}
