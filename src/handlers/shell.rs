// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Shell handler
//!
//! Executes `--command` through a shell and returns its stdout.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tokio::process::Command;

use super::StageHandler;
use crate::errors::HandlerError;
use crate::pipeline::StageConfig;
use crate::utils::millis;

/// Shell handler
pub struct ShellHandler {
    /// Shell used when the stage does not pass `--shell`
    shell: String,
}

impl ShellHandler {
    /// Create a new shell handler
    pub fn new(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }
}

impl Default for ShellHandler {
    fn default() -> Self {
        Self::new("bash")
    }
}

/// Strip a single trailing line break
pub(crate) fn trim_trailing_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    s
}

#[async_trait]
impl StageHandler for ShellHandler {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        let command = config.require_str("command")?;
        if command.trim().is_empty() {
            return Err(HandlerError::new("shell command is empty"));
        }

        let shell = config.get_str("shell").unwrap_or(&self.shell);
        let start = Instant::now();

        let mut cmd = Command::new(shell);
        cmd.arg("-c").arg(command).kill_on_drop(true);
        if let Some(dir) = config.get_str("cwd") {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            HandlerError::new(format!("failed to start '{}': {}", shell, e))
                .with_help(format!("Shell '{}' may not be available", shell))
        })?;

        tracing::debug!(
            shell,
            exit_code = output.status.code().unwrap_or(-1),
            elapsed_ms = millis(start.elapsed()),
            "shell command finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(HandlerError::new(if stderr.is_empty() {
                format!("command exited with code {}", exit_code)
            } else {
                format!("command exited with code {}: {}", exit_code, stderr)
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(Value::String(trim_trailing_newline(stdout)))
    }

    fn description(&self) -> String {
        format!("Run --command with {} and return stdout", self.shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shell_config(command: &str) -> StageConfig {
        [("command", command)].into_iter().collect()
    }

    #[test]
    fn test_trim_trailing_newline() {
        assert_eq!(trim_trailing_newline("a\n".into()), "a");
        assert_eq!(trim_trailing_newline("a\r\n".into()), "a");
        assert_eq!(trim_trailing_newline("a\n\n".into()), "a\n");
        assert_eq!(trim_trailing_newline("a".into()), "a");
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let out = ShellHandler::new("sh")
            .invoke(&shell_config("echo hello"))
            .await
            .unwrap();
        assert_eq!(out, json!("hello"));
    }

    #[tokio::test]
    async fn test_pipes_inside_command() {
        let out = ShellHandler::new("sh")
            .invoke(&shell_config("printf 'a\\nb\\n' | wc -l | tr -d ' '"))
            .await
            .unwrap();
        assert_eq!(out, json!("2"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let err = ShellHandler::new("sh")
            .invoke(&shell_config("echo broken >&2; exit 3"))
            .await
            .unwrap_err();
        assert!(err.message.contains("code 3"));
        assert!(err.message.contains("broken"));
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let err = ShellHandler::default()
            .invoke(&shell_config("  "))
            .await
            .unwrap_err();
        assert!(err.message.contains("empty"));
    }
}
