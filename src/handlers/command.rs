// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Command handler
//!
//! Runs an external program declared in the settings file. Stage options
//! are passed as `--name value` arguments or as a JSON object on stdin;
//! stdout becomes the stage output.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

use super::shell::trim_trailing_newline;
use super::StageHandler;
use crate::config::{CommandHandlerConfig, CommandInput};
use crate::errors::{HandlerError, StagepipeError, StagepipeResult};
use crate::pipeline::{ConfigValue, StageConfig};

/// External command handler
#[derive(Debug)]
pub struct CommandHandler {
    /// Resolved program path
    program: PathBuf,
    config: CommandHandlerConfig,
}

impl CommandHandler {
    /// Create a handler, resolving the program on PATH
    pub fn new(config: CommandHandlerConfig) -> StagepipeResult<Self> {
        let program = if config.program.contains(std::path::MAIN_SEPARATOR) || config.program.contains('/') {
            PathBuf::from(&config.program)
        } else {
            which::which(&config.program).map_err(|_| StagepipeError::InvalidConfig {
                reason: format!("program '{}' not found", config.program),
                help: Some(format!(
                    "Install {} and ensure it's in your PATH, or give a path",
                    config.program
                )),
            })?
        };

        Ok(Self { program, config })
    }

    /// Arguments for one invocation
    fn build_args(&self, stage_config: &StageConfig) -> Vec<String> {
        let mut args = self.config.args.clone();

        if self.config.input == CommandInput::Flags {
            for (name, value) in stage_config.iter() {
                match value {
                    ConfigValue::Text(text) => {
                        args.push(format!("--{}", name));
                        args.push(text.clone());
                    }
                    ConfigValue::Flag(true) => args.push(format!("--{}", name)),
                    ConfigValue::Flag(false) => {}
                }
            }
        }

        args
    }

    async fn run(&self, stage_config: &StageConfig) -> Result<std::process::Output, HandlerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(stage_config))
            .envs(&self.config.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let stdin = match self.config.input {
            CommandInput::Json => Some(serde_json::to_vec(&stage_config.to_json())?),
            CommandInput::Flags => None,
        };
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| {
            HandlerError::new(format!(
                "failed to start '{}': {}",
                self.program.display(),
                e
            ))
        })?;

        // Feed stdin while collecting output, or a program that echoes
        // its input fills the stdout pipe and both sides block
        let pipe = child.stdin.take();
        let feed = async move {
            match (stdin, pipe) {
                (Some(bytes), Some(pipe)) => write_stdin(pipe, &bytes).await,
                _ => Ok(()),
            }
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;
        Ok(output)
    }
}

/// Write the payload and close the pipe
///
/// A program may exit without reading all of its input; the exit status
/// decides the outcome then, not the broken pipe.
async fn write_stdin(mut pipe: ChildStdin, bytes: &[u8]) -> std::io::Result<()> {
    match pipe.write_all(bytes).await {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            tracing::debug!("program closed stdin early");
            Ok(())
        }
        other => other,
    }
}

#[async_trait]
impl StageHandler for CommandHandler {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        let output = match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.run(config))
                .await
                .map_err(|_| {
                    HandlerError::new(format!(
                        "'{}' timed out after {}s",
                        self.config.program, secs
                    ))
                })??,
            None => self.run(config).await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HandlerError::new(format!(
                "'{}' exited with code {}{}",
                self.config.program,
                output.status.code().unwrap_or(-1),
                if stderr.is_empty() {
                    String::new()
                } else {
                    format!(": {}", stderr)
                }
            )));
        }

        let stdout = trim_trailing_newline(String::from_utf8_lossy(&output.stdout).to_string());

        if self.config.parse_json {
            if let Ok(value) = serde_json::from_str::<Value>(&stdout) {
                return Ok(value);
            }
            tracing::debug!(program = %self.config.program, "stdout is not JSON, keeping text");
        }

        Ok(Value::String(stdout))
    }

    fn description(&self) -> String {
        self.config
            .description
            .clone()
            .unwrap_or_else(|| format!("Run {}", self.program.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn handler_config(program: &str, args: &[&str]) -> CommandHandlerConfig {
        CommandHandlerConfig {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            input: CommandInput::Flags,
            parse_json: false,
            timeout_secs: None,
            env: HashMap::new(),
            description: None,
        }
    }

    #[test]
    fn test_unknown_program_rejected() {
        let err = CommandHandler::new(handler_config("definitely-not-a-real-program-xyz", &[])).unwrap_err();
        assert!(matches!(err, StagepipeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_build_flag_args() {
        let handler = CommandHandler::new(handler_config("sh", &["-c", "true"])).unwrap();
        let config: StageConfig = [
            ("prompt", ConfigValue::from("a cat")),
            ("hd", ConfigValue::from(true)),
            ("dry", ConfigValue::from(false)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            handler.build_args(&config),
            vec!["-c", "true", "--prompt", "a cat", "--hd"]
        );
    }

    #[tokio::test]
    async fn test_flags_reach_program() {
        // sh -c 'script' argv0 args...
        let handler = CommandHandler::new(handler_config(
            "sh",
            &["-c", "echo \"$@\"", "stage"],
        ))
        .unwrap();
        let config: StageConfig = [("name", "world")].into_iter().collect();

        let out = handler.invoke(&config).await.unwrap();
        assert_eq!(out, json!("--name world"));
    }

    #[tokio::test]
    async fn test_json_stdin_and_output() {
        let mut cfg = handler_config("cat", &[]);
        cfg.input = CommandInput::Json;
        cfg.parse_json = true;
        let handler = CommandHandler::new(cfg).unwrap();

        let config: StageConfig = [("k", "v")].into_iter().collect();
        let out = handler.invoke(&config).await.unwrap();
        assert_eq!(out, json!({"k": "v"}));
    }

    #[tokio::test]
    async fn test_large_json_stdin_through_echoing_program() {
        let mut cfg = handler_config("cat", &[]);
        cfg.input = CommandInput::Json;
        cfg.parse_json = true;
        let handler = CommandHandler::new(cfg).unwrap();

        let text = "x".repeat(1 << 20);
        let config: StageConfig = [("text", text.as_str())].into_iter().collect();

        let out = tokio::time::timeout(Duration::from_secs(30), handler.invoke(&config))
            .await
            .expect("cat should not block on a large payload")
            .unwrap();
        assert_eq!(out["text"].as_str().map(str::len), Some(1 << 20));
    }

    #[tokio::test]
    async fn test_program_ignoring_stdin_keeps_its_result() {
        let mut cfg = handler_config("sh", &["-c", "echo done"]);
        cfg.input = CommandInput::Json;
        let handler = CommandHandler::new(cfg).unwrap();

        let text = "x".repeat(1 << 20);
        let config: StageConfig = [("text", text.as_str())].into_iter().collect();
        assert_eq!(handler.invoke(&config).await.unwrap(), json!("done"));
    }

    #[tokio::test]
    async fn test_program_ignoring_stdin_keeps_its_failure() {
        let mut cfg = handler_config("sh", &["-c", "echo bad input >&2; exit 3"]);
        cfg.input = CommandInput::Json;
        let handler = CommandHandler::new(cfg).unwrap();

        let text = "x".repeat(1 << 20);
        let config: StageConfig = [("text", text.as_str())].into_iter().collect();
        let err = handler.invoke(&config).await.unwrap_err();
        assert!(err.message.contains("code 3"));
        assert!(err.message.contains("bad input"));
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let handler = CommandHandler::new(handler_config(
            "sh",
            &["-c", "echo no key >&2; exit 2"],
        ))
        .unwrap();

        let err = handler.invoke(&StageConfig::new()).await.unwrap_err();
        assert!(err.message.contains("code 2"));
        assert!(err.message.contains("no key"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut cfg = handler_config("sleep", &["5"]);
        cfg.timeout_secs = Some(1);
        let handler = CommandHandler::new(cfg).unwrap();

        let err = handler.invoke(&StageConfig::new()).await.unwrap_err();
        assert!(err.message.contains("timed out"));
    }
}
