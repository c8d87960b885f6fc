// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Pipeline engine
//!
//! Parsing, placeholder resolution, validation and execution of inline
//! pipeline expressions.

mod context;
mod definition;
mod executor;
pub mod parser;
pub mod template;
mod validation;

pub use context::ExecutionContext;
pub use definition::*;
pub use executor::{run_expression, ExecutionOptions, PipelineExecutor, PipelineResult, StageResult};
pub use parser::parse;
pub use validation::{PipelineValidator, ValidationResult};
