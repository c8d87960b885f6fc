// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Pipeline executor
//!
//! Runs pipeline stages strictly in order. Each stage sees the outputs of
//! the stages before it; the first failure stops the run.

use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{StageError, StagepipeError, StagepipeResult};
use crate::handlers::HandlerRegistry;
use crate::pipeline::{template, ExecutionContext, Pipeline, PipelineValidator, StageDescriptor};
use crate::utils::{millis, stage_spinner};

/// Pipeline execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Print per-stage progress to stdout
    pub show_progress: bool,
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Position in the pipeline
    pub index: usize,
    /// Stage type
    #[serde(rename = "type")]
    pub stage_type: String,
    /// Handler output, absent on failure
    pub output: Option<Value>,
    /// Failure, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
    /// Wall time spent on the stage
    pub duration_ms: u64,
}

impl StageResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of executing a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Pipeline name
    pub pipeline: String,
    /// One entry per attempted stage, in order
    pub stages: Vec<StageResult>,
    /// Whether every stage succeeded
    pub succeeded: bool,
    /// Total execution time
    pub duration_ms: u64,
}

impl PipelineResult {
    /// The error of the failing stage, if the run failed
    pub fn failure(&self) -> Option<&StageError> {
        self.stages.iter().find_map(|s| s.error.as_ref())
    }

    /// Output of the last stage when the run completed
    pub fn final_output(&self) -> Option<&Value> {
        if !self.succeeded {
            return None;
        }
        self.stages.last().and_then(|s| s.output.as_ref())
    }

    /// Convert a failed run into its error
    pub fn into_result(self) -> StagepipeResult<Self> {
        let failed = self
            .stages
            .iter()
            .find_map(|s| s.error.as_ref().map(|e| e.to_error(&s.stage_type)));

        match failed {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

/// Run state, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running(usize),
    Completed,
    Failed(usize),
}

/// Pipeline executor
///
/// Holds only the read-only registry; every call to [`execute`] gets its
/// own [`ExecutionContext`], so one executor can serve concurrent runs.
///
/// [`execute`]: PipelineExecutor::execute
#[derive(Debug, Clone)]
pub struct PipelineExecutor {
    registry: Arc<HandlerRegistry>,
    options: ExecutionOptions,
}

impl PipelineExecutor {
    /// Create a new pipeline executor
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            options: ExecutionOptions::default(),
        }
    }

    /// Set execution options
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Execute a pipeline
    ///
    /// Unknown stage types are reported as `Err` before any stage runs.
    /// Failures while running are recorded on the returned trace.
    pub async fn execute(&self, pipeline: &Pipeline) -> StagepipeResult<PipelineResult> {
        PipelineValidator::preflight(pipeline, &self.registry)?;

        let start = Instant::now();
        let mut state = RunState::Idle;
        let mut context = ExecutionContext::new();
        let mut results = Vec::with_capacity(pipeline.stages.len());

        tracing::info!(pipeline = %pipeline.name, stages = pipeline.stages.len(), "starting pipeline");

        if self.options.show_progress {
            self.print_execution_plan(pipeline);
        }

        for (index, stage) in pipeline.stages.iter().enumerate() {
            state = transition(state, RunState::Running(index));

            let spinner = self
                .options
                .show_progress
                .then(|| stage_spinner(index, &stage.stage_type));

            let stage_start = Instant::now();
            let outcome = self.execute_stage(index, stage, &context).await;
            let duration_ms = millis(stage_start.elapsed());

            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            match outcome {
                Ok(output) => {
                    if self.options.show_progress {
                        println!(
                            "  {} {} ({:.2}s)",
                            "✓".green(),
                            stage.stage_type.bold(),
                            stage_start.elapsed().as_secs_f64()
                        );
                    }

                    context.record(&stage.stage_type, output.clone());
                    results.push(StageResult {
                        index,
                        stage_type: stage.stage_type.clone(),
                        output: Some(output),
                        error: None,
                        duration_ms,
                    });
                }
                Err(error) => {
                    if self.options.show_progress {
                        println!("  {} {} failed", "✗".red(), stage.stage_type.bold());
                    }

                    tracing::warn!(index, stage_type = %stage.stage_type, error = %error, "stage failed");

                    results.push(StageResult {
                        index,
                        stage_type: stage.stage_type.clone(),
                        output: None,
                        error: Some(StageError::from_error(&error, index)),
                        duration_ms,
                    });
                    state = transition(state, RunState::Failed(index));
                    break;
                }
            }
        }

        if !matches!(state, RunState::Failed(_)) {
            state = transition(state, RunState::Completed);
        }

        let succeeded = state == RunState::Completed;
        let duration = start.elapsed();

        tracing::info!(
            pipeline = %pipeline.name,
            succeeded,
            completed = results.iter().filter(|r| r.succeeded()).count(),
            elapsed_ms = millis(duration),
            "pipeline finished"
        );

        if self.options.show_progress {
            println!();
            if succeeded {
                println!(
                    "{}",
                    format!("Pipeline completed successfully in {:.2}s", duration.as_secs_f64()).green()
                );
            } else {
                println!(
                    "{}",
                    format!("Pipeline failed after {:.2}s", duration.as_secs_f64()).red()
                );
            }
        }

        Ok(PipelineResult {
            pipeline: pipeline.name.clone(),
            stages: results,
            succeeded,
            duration_ms: millis(duration),
        })
    }

    /// Resolve a stage's placeholders and invoke its handler
    async fn execute_stage(
        &self,
        index: usize,
        stage: &StageDescriptor,
        context: &ExecutionContext,
    ) -> StagepipeResult<Value> {
        let handler = self.registry.resolve_handler(&stage.stage_type, index)?;

        let config = template::resolve(&stage.config, context).map_err(|unresolved| {
            StagepipeError::UnresolvedReference {
                reference: unresolved.reference,
                stage_type: stage.stage_type.clone(),
                index,
            }
        })?;

        handler
            .invoke(&config)
            .await
            .map_err(|e| e.into_stage_error(&stage.stage_type, index))
    }

    /// Print the execution plan
    fn print_execution_plan(&self, pipeline: &Pipeline) {
        println!();
        println!("{}: {}", "Pipeline".bold(), pipeline.name);
        println!("{}", "═".repeat(50));
        println!(
            "Execution plan ({} stage{}):",
            pipeline.stages.len(),
            if pipeline.stages.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, stage) in pipeline.stages.iter().enumerate() {
            print!("  {}. {}", i + 1, stage.stage_type.bold());

            let refs: Vec<&str> = stage
                .config
                .iter()
                .filter_map(|(_, v)| v.as_str())
                .flat_map(template::references)
                .collect();
            if !refs.is_empty() {
                print!(" {}", format!("[uses: {}]", refs.join(", ")).dimmed());
            }

            println!();
        }

        println!();
    }
}

fn transition(from: RunState, to: RunState) -> RunState {
    match to {
        RunState::Running(index) | RunState::Failed(index) => {
            tracing::debug!(from = ?from, to = ?to, index, "run state")
        }
        RunState::Idle | RunState::Completed => tracing::debug!(from = ?from, to = ?to, "run state"),
    }
    to
}

/// Parse and execute an expression in one step
pub async fn run_expression(
    registry: Arc<HandlerRegistry>,
    expression: &str,
) -> StagepipeResult<PipelineResult> {
    let pipeline = Pipeline::parse(expression)?;
    PipelineExecutor::new(registry).execute(&pipeline).await
}
