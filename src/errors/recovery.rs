// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

use super::{ErrorKind, StagepipeError};

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Example expressions or commands
    pub examples: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest a fix for a malformed expression
    pub fn fix_expression(message: &str) -> Self {
        let mut steps = vec![format!("The parser reported: {}", message)];

        if message.contains("unterminated") {
            steps.push("Close every opening quote with the same quote character".into());
        }
        if message.contains("no stage type") {
            steps.push("Every segment between `|` must start with a stage type".into());
            steps.push("Remove doubled or trailing pipe characters".into());
        }
        steps.push("Quote values that contain spaces or `|`".into());

        Self {
            action: "Fix the pipeline expression".into(),
            steps,
            examples: vec![
                "fetch --url http://example.com | analyze --prompt \"Summarize {{fetch}}\"".into(),
                "shell --command 'ls | wc -l'".into(),
            ],
        }
    }

    /// Suggest registering or correcting a stage type
    pub fn register_stage(stage_type: &str, available: &[String]) -> Self {
        let mut steps = vec![format!("No handler is registered for '{}'", stage_type)];

        if let Some(close) = closest_match(stage_type, available) {
            steps.push(format!("Did you mean '{}'?", close));
        }
        steps.push("Declare an external command handler in .stagepipe.yaml".into());

        Self {
            action: format!("Register a handler for '{}'", stage_type),
            steps,
            examples: vec![format!(
                "handlers:\n  {}:\n    program: ./scripts/{}.py\n    input: flags",
                stage_type, stage_type
            )],
        }
    }

    /// Suggest reordering stages so a reference resolves
    pub fn reorder_stages(reference: &str) -> Self {
        Self {
            action: format!("Run '{}' before the stage that references it", reference),
            steps: vec![
                format!("'{{{{{}}}}}' only resolves after a '{}' stage completes", reference, reference),
                "Move the referenced stage to the left of the referencing one".into(),
                "Check the placeholder for typos".into(),
            ],
            examples: vec![format!(
                "{} ... | next --input \"{{{{{}}}}}\"",
                reference, reference
            )],
        }
    }

    /// Suggest what to do after a handler failure
    pub fn handler_failed(stage_type: &str) -> Self {
        Self {
            action: format!("Inspect the '{}' stage", stage_type),
            steps: vec![
                "The handler reported an error; stages after it were not run".into(),
                "Re-run with --verbose to see stage-level logs".into(),
            ],
            examples: vec![],
        }
    }

    /// Pick a suggestion for an engine error
    pub fn for_error(error: &StagepipeError, available: &[String]) -> Option<Self> {
        match error {
            StagepipeError::Parse { message, .. } => Some(Self::fix_expression(message)),
            StagepipeError::UnknownStage { stage_type, .. } => {
                Some(Self::register_stage(stage_type, available))
            }
            StagepipeError::UnresolvedReference { reference, .. } => {
                Some(Self::reorder_stages(reference))
            }
            StagepipeError::Handler { stage_type, .. } => Some(Self::handler_failed(stage_type)),
            _ => match error.kind() {
                ErrorKind::Config => Some(Self {
                    action: "Check the settings file".into(),
                    steps: vec!["Validate .stagepipe.yaml against the documented fields".into()],
                    examples: vec![],
                }),
                _ => None,
            },
        }
    }
}

/// Find the registered name sharing the longest common prefix with `name`
fn closest_match<'a>(name: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| {
            let shared = c
                .chars()
                .zip(name.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (shared, c.as_str())
        })
        .filter(|(shared, _)| *shared >= 2)
        .max_by_key(|(shared, _)| *shared)
        .map(|(_, c)| c)
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.action)?;

        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step)?;
        }

        if !self.examples.is_empty() {
            writeln!(f)?;
            writeln!(f, "Example:")?;
            for example in &self.examples {
                writeln!(f, "  {}", example)?;
            }
        }

        Ok(())
    }
}
