// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! # stagepipe - Inline Pipeline Runner
//!
//! `stagepipe` parses a single pipeline expression such as
//!
//! ```text
//! fetch --url http://example.com | analyze --prompt "Summarize {{fetch}}"
//! ```
//!
//! into typed stages, then runs them left to right. A stage's options may
//! name the output of an earlier stage with `{{stage}}`.
//!
//! ## Features
//!
//! - **Quote-aware parsing** - pipes inside quoted values stay literal
//! - **Pluggable handlers** - stage types map to [`handlers::StageHandler`] implementations
//! - **Fail-fast execution** - the first failing stage ends the run, with a trace of what ran
//! - **External commands** - wrap any script as a stage type in `.stagepipe.yaml`
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use stagepipe::{run_expression, HandlerRegistry};
//!
//! # async fn demo() -> stagepipe::StagepipeResult<()> {
//! let mut registry = HandlerRegistry::new();
//! registry.register_fn("fetch", |_| Ok(json!("doc text")));
//! registry.register_fn("analyze", |config| Ok(json!(config.require_str("prompt")?)));
//!
//! let result = run_expression(
//!     Arc::new(registry),
//!     r#"fetch --url http://x | analyze --prompt "Summarize {{fetch}}""#,
//! )
//! .await?;
//! assert_eq!(result.final_output(), Some(&json!("Summarize doc text")));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use errors::{ErrorKind, HandlerError, StageError, StagepipeError, StagepipeResult};
pub use handlers::{create_default_registry, HandlerRegistry, StageHandler};
pub use pipeline::{
    run_expression, ExecutionContext, Pipeline, PipelineExecutor, PipelineResult, StageConfig,
    StageDescriptor, StageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
