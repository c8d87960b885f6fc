// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Echo handler
//!
//! Returns `--text` unchanged, or the whole option set as a JSON object
//! when no text is given.

use async_trait::async_trait;
use serde_json::Value;

use super::StageHandler;
use crate::errors::HandlerError;
use crate::pipeline::StageConfig;

/// Echo handler
pub struct EchoHandler;

impl EchoHandler {
    /// Create a new echo handler
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for EchoHandler {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        match config.get_str("text") {
            Some(text) => Ok(Value::String(text.to_string())),
            None => Ok(config.to_json()),
        }
    }

    fn description(&self) -> String {
        "Return --text, or all options as a JSON object".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_text() {
        let config: StageConfig = [("text", "hello")].into_iter().collect();
        let out = EchoHandler::new().invoke(&config).await.unwrap();
        assert_eq!(out, json!("hello"));
    }

    #[test]
    fn test_echo_without_text_returns_options() {
        let config: StageConfig = [("a", "1"), ("b", "2")].into_iter().collect();
        let out = tokio_test::block_on(EchoHandler::new().invoke(&config)).unwrap();
        assert_eq!(out, json!({"a": "1", "b": "2"}));
    }
}
