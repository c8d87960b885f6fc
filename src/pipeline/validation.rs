// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Pipeline validation
//!
//! Checks a parsed pipeline against the handler registry before anything
//! runs.

use std::collections::HashSet;

use crate::errors::StagepipeResult;
use crate::handlers::HandlerRegistry;
use crate::pipeline::{template, Pipeline};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Fail on the first stage whose type has no handler
    ///
    /// Runs before execution so that a pipeline with an unknown stage
    /// anywhere never starts.
    pub fn preflight(pipeline: &Pipeline, registry: &HandlerRegistry) -> StagepipeResult<()> {
        for (index, stage) in pipeline.stages.iter().enumerate() {
            registry.resolve_handler(&stage.stage_type, index)?;
        }
        Ok(())
    }

    /// Collect every problem in a pipeline
    ///
    /// Unknown stage types are errors. Placeholders that can never resolve
    /// (the referenced type does not run earlier) are only warnings: the
    /// executor reports them when the stage is reached.
    pub fn validate(pipeline: &Pipeline, registry: &HandlerRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for (index, stage) in pipeline.stages.iter().enumerate() {
            if !registry.has(&stage.stage_type) {
                result.add_error(&format!(
                    "Stage {} ('{}'): no handler registered for this stage type",
                    index, stage.stage_type
                ));
            }

            for (name, value) in stage.config.iter() {
                let Some(text) = value.as_str() else {
                    continue;
                };

                for reference in template::references(text) {
                    if !seen.contains(reference) {
                        result.add_warning(&format!(
                            "Stage {} ('{}'): --{} references '{{{{{}}}}}' which does not run before it",
                            index, stage.stage_type, name, reference
                        ));
                    }
                }
            }

            seen.insert(&stage.stage_type);
        }

        result
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
