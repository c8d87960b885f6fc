// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Plain-text rendering of pipelines and run results

use std::fmt::Write;

use crate::pipeline::{template, ConfigValue, Pipeline, PipelineResult};

/// Indent every line of `text` by `width` spaces
fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Describe a parsed pipeline, one stage per line with its options
pub fn render_pipeline(pipeline: &Pipeline) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Pipeline: {}", pipeline.name);

    for (i, stage) in pipeline.stages.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, stage.stage_type);
        for (name, value) in stage.config.iter() {
            match value {
                ConfigValue::Text(text) => {
                    let _ = writeln!(out, "       --{} {:?}", name, text);
                }
                ConfigValue::Flag(b) => {
                    let _ = writeln!(out, "       --{} ({})", name, b);
                }
            }
        }
    }

    out
}

/// Describe a run: each attempted stage with its output or error
pub fn render_result(result: &PipelineResult) -> String {
    let mut out = String::new();

    for stage in &result.stages {
        match (&stage.output, &stage.error) {
            (_, Some(error)) => {
                let _ = writeln!(out, "[{}] {} failed ({}ms)", stage.index, stage.stage_type, stage.duration_ms);
                let _ = writeln!(out, "{}", indent(&error.to_string(), 4));
                if let Some(ref help) = error.help {
                    let _ = writeln!(out, "{}", indent(&format!("help: {}", help), 4));
                }
            }
            (output, None) => {
                let _ = writeln!(out, "[{}] {} ok ({}ms)", stage.index, stage.stage_type, stage.duration_ms);
                let text = output.as_ref().map(template::render_output).unwrap_or_default();
                if !text.is_empty() {
                    let _ = writeln!(out, "{}", indent(&text, 4));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, StageError};
    use crate::pipeline::StageResult;
    use serde_json::json;

    #[test]
    fn test_render_pipeline() {
        let pipeline = Pipeline::parse(r#"fetch --url http://x --raw | analyze --prompt "a b""#).unwrap();
        let text = render_pipeline(&pipeline);

        assert!(text.contains("1. fetch"));
        assert!(text.contains(r#"--url "http://x""#));
        assert!(text.contains("--raw (true)"));
        assert!(text.contains("2. analyze"));
    }

    #[test]
    fn test_render_failed_result() {
        let result = PipelineResult {
            pipeline: "a|b#00000000".into(),
            stages: vec![
                StageResult {
                    index: 0,
                    stage_type: "a".into(),
                    output: Some(json!("line one\nline two")),
                    error: None,
                    duration_ms: 1,
                },
                StageResult {
                    index: 1,
                    stage_type: "b".into(),
                    output: None,
                    error: Some(StageError {
                        kind: ErrorKind::Handler,
                        message: "boom".into(),
                        stage_index: 1,
                        reference: None,
                        help: Some("try again".into()),
                    }),
                    duration_ms: 2,
                },
            ],
            succeeded: false,
            duration_ms: 3,
        };

        let text = render_result(&result);
        assert!(text.contains("[0] a ok (1ms)\n    line one\n    line two\n"));
        assert!(text.contains("[1] b failed (2ms)\n    [handler] boom\n    help: try again\n"));
    }
}
