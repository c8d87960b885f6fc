// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Error types
//!
//! Every failure the engine can report falls into one of four kinds:
//! malformed expressions, unregistered stage types, unresolved
//! placeholders and failing handlers. Configuration and I/O errors only
//! occur around the engine (settings loading, CLI).

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stagepipe operations
pub type StagepipeResult<T> = Result<T, StagepipeError>;

/// Broad classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    UnknownStage,
    UnresolvedReference,
    Handler,
    Config,
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::UnknownStage => write!(f, "unknown_stage"),
            Self::UnresolvedReference => write!(f, "unresolved_reference"),
            Self::Handler => write!(f, "handler"),
            Self::Config => write!(f, "config"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Main error type for stagepipe
#[derive(Error, Debug, Diagnostic)]
pub enum StagepipeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Expression Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Parse error: {message}")]
    #[diagnostic(
        code(stagepipe::parse_error),
        help("Expected `stage --flag value | stage --flag \"quoted value\"`")
    )]
    Parse {
        message: String,
        /// Byte offset into the expression, when known
        position: Option<usize>,
    },

    #[error("Unknown stage type '{stage_type}' (stage {index})")]
    #[diagnostic(
        code(stagepipe::unknown_stage),
        help("Registered stage types: {available}")
    )]
    UnknownStage {
        stage_type: String,
        index: usize,
        available: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage {index} ('{stage_type}') references '{{{{{reference}}}}}' which has not run yet")]
    #[diagnostic(
        code(stagepipe::unresolved_reference),
        help("A placeholder can only name a stage type that appears earlier in the pipeline")
    )]
    UnresolvedReference {
        reference: String,
        stage_type: String,
        index: usize,
    },

    #[error("Stage {index} ('{stage_type}') failed: {message}")]
    #[diagnostic(code(stagepipe::handler_failed))]
    Handler {
        stage_type: String,
        index: usize,
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Config file not found: {path}")]
    #[diagnostic(code(stagepipe::config_not_found))]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(stagepipe::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stagepipe::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(stagepipe::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(stagepipe::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(stagepipe::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for StagepipeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StagepipeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StagepipeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for StagepipeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl StagepipeError {
    /// Create a parse error at a byte offset
    pub fn parse_at(message: impl Into<String>, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Create a parse error without position information
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            position: None,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UnknownStage { .. } => ErrorKind::UnknownStage,
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::Handler { .. } => ErrorKind::Handler,
            Self::ConfigNotFound { .. } | Self::InvalidConfig { .. } => ErrorKind::Config,
            Self::Io { .. } | Self::Yaml { .. } | Self::Json { .. } | Self::Toml { .. } => {
                ErrorKind::Io
            }
        }
    }

    /// Index of the stage the error is attributed to, if any
    pub fn stage_index(&self) -> Option<usize> {
        match self {
            Self::UnknownStage { index, .. }
            | Self::UnresolvedReference { index, .. }
            | Self::Handler { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failure recorded on a [`StageResult`](crate::pipeline::StageResult)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    /// Failure kind (`unresolved_reference` or `handler`)
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Index of the failing stage
    pub stage_index: usize,
    /// Placeholder that could not be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Optional hint from the handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl StageError {
    /// Build a stage error from an engine error raised while running a stage
    ///
    /// Handler failures keep the handler's own message; other errors use
    /// their full description.
    pub fn from_error(error: &StagepipeError, stage_index: usize) -> Self {
        let (message, reference, help) = match error {
            StagepipeError::Handler { message, help, .. } => (message.clone(), None, help.clone()),
            StagepipeError::UnresolvedReference { reference, .. } => {
                (error.to_string(), Some(reference.clone()), None)
            }
            other => (other.to_string(), None, None),
        };

        Self {
            kind: error.kind(),
            message,
            stage_index: error.stage_index().unwrap_or(stage_index),
            reference,
            help,
        }
    }

    /// Turn the recorded failure back into an engine error
    pub fn to_error(&self, stage_type: &str) -> StagepipeError {
        match (self.kind, &self.reference) {
            (ErrorKind::UnresolvedReference, Some(reference)) => StagepipeError::UnresolvedReference {
                reference: reference.clone(),
                stage_type: stage_type.to_string(),
                index: self.stage_index,
            },
            _ => StagepipeError::Handler {
                stage_type: stage_type.to_string(),
                index: self.stage_index,
                message: self.message.clone(),
                help: self.help.clone(),
            },
        }
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Error returned by a stage handler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub help: Option<String>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
        }
    }

    /// Attach a hint shown alongside the failure
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Error for a missing required option
    pub fn missing_option(name: &str) -> Self {
        Self::new(format!("missing required option --{}", name))
            .with_help(format!("Pass it as `--{} <value>`", name))
    }

    /// Attribute this failure to a pipeline stage
    pub fn into_stage_error(self, stage_type: &str, index: usize) -> StagepipeError {
        StagepipeError::Handler {
            stage_type: stage_type.to_string(),
            index,
            message: self.message,
            help: self.help,
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}
