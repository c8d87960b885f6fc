// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! JSON handler
//!
//! Parses `--value` as JSON, producing a structured stage output.

use async_trait::async_trait;
use serde_json::Value;

use super::StageHandler;
use crate::errors::HandlerError;
use crate::pipeline::StageConfig;

/// JSON handler
pub struct JsonHandler;

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for JsonHandler {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        let raw = config.require_str("value")?;

        serde_json::from_str(raw).map_err(|e| {
            HandlerError::new(format!("--value is not valid JSON: {}", e))
                .with_help("Wrap the JSON in single quotes: --value '{\"key\": 1}'")
        })
    }

    fn description(&self) -> String {
        "Parse --value as JSON".into()
    }
}
