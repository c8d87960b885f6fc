// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Read handler
//!
//! Reads `--path` as UTF-8 text.

use async_trait::async_trait;
use serde_json::Value;

use super::StageHandler;
use crate::errors::HandlerError;
use crate::pipeline::StageConfig;

/// File read handler
pub struct ReadHandler;

impl ReadHandler {
    /// Create a new read handler
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for ReadHandler {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        let path = config.require_str("path")?;

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            HandlerError::new(format!("failed to read '{}': {}", path, e))
        })?;

        Ok(Value::String(content))
    }

    fn description(&self) -> String {
        "Read the file at --path".into()
    }
}
