// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! End-to-end engine scenarios with in-process handlers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use stagepipe::pipeline::template;
use stagepipe::{
    create_default_registry, run_expression, ErrorKind, ExecutionContext, HandlerError,
    HandlerRegistry, Pipeline, PipelineExecutor, StageConfig, StageHandler,
};

/// Records every config it receives and echoes `--prompt`
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<StageConfig>>,
}

#[async_trait]
impl StageHandler for Recorder {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        self.seen.lock().unwrap().push(config.clone());
        Ok(json!(config.get_str("prompt").unwrap_or_default()))
    }
}

/// Sleeps before answering, to overlap concurrent runs
struct Slow(&'static str);

#[async_trait]
impl StageHandler for Slow {
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(json!(format!("{}:{}", self.0, config.get_str("id").unwrap_or("?"))))
    }
}

fn fetch_analyze_registry() -> (HandlerRegistry, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let mut registry = HandlerRegistry::new();
    registry.register_fn("fetch", |_| Ok(json!("doc text")));
    registry.register_arc("analyze", recorder.clone());
    (registry, recorder)
}

#[tokio::test]
async fn fetch_then_analyze_produces_resolved_prompt() {
    let (registry, recorder) = fetch_analyze_registry();

    let result = run_expression(
        Arc::new(registry),
        r#"fetch --url http://x | analyze --prompt "Summarize {{fetch}}""#,
    )
    .await
    .unwrap();

    assert!(result.succeeded);
    assert_eq!(result.stages.len(), 2);
    assert_eq!(result.stages[0].stage_type, "fetch");
    assert_eq!(result.stages[1].output, Some(json!("Summarize doc text")));

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get_str("prompt"), Some("Summarize doc text"));
}

#[tokio::test]
async fn stage_three_never_runs_after_stage_two_fails() {
    let third_calls = Arc::new(AtomicUsize::new(0));
    let counter = third_calls.clone();

    let mut registry = HandlerRegistry::new();
    registry.register_fn("one", |_| Ok(json!(1)));
    registry.register_fn("two", |_| {
        Err(HandlerError::new("upstream unavailable").with_help("retry later"))
    });
    registry.register_fn("three", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!(3))
    });

    let result = run_expression(Arc::new(registry), "one | two | three")
        .await
        .unwrap();

    assert!(!result.succeeded);
    assert_eq!(result.stages.len(), 2);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);

    let failure = result.stages[1].error.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::Handler);
    assert_eq!(failure.stage_index, 1);
    assert_eq!(failure.help.as_deref(), Some("retry later"));
}

#[tokio::test]
async fn unknown_stage_anywhere_blocks_the_first_stage() {
    let (registry, recorder) = fetch_analyze_registry();

    let err = run_expression(
        Arc::new(registry),
        "analyze --prompt a | fetch | summarize",
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownStage);
    assert_eq!(err.stage_index(), Some(2));
    assert!(recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn forward_reference_fails_when_stage_executes() {
    let (registry, recorder) = fetch_analyze_registry();

    let result = run_expression(
        Arc::new(registry),
        r#"fetch | analyze --prompt "{{analyze}}" | analyze --prompt x"#,
    )
    .await
    .unwrap();

    assert!(!result.succeeded);
    assert_eq!(result.stages.len(), 2);
    assert!(result.stages[0].succeeded());

    let failure = result.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::UnresolvedReference);
    assert_eq!(failure.stage_index, 1);
    assert_eq!(failure.reference.as_deref(), Some("analyze"));
    assert!(recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn completed_trace_has_one_entry_per_stage() {
    let registry = create_default_registry(&Default::default());
    let pipeline = Pipeline::parse(
        r#"json --value '{"items": [1, 2]}' | echo --text "items={{json}}" | echo --text "{{echo}}!""#,
    )
    .unwrap();

    let result = PipelineExecutor::new(Arc::new(registry))
        .execute(&pipeline)
        .await
        .unwrap();

    assert!(result.succeeded);
    assert_eq!(result.stages.len(), pipeline.stages.len());
    for (i, stage) in result.stages.iter().enumerate() {
        assert_eq!(stage.index, i);
        assert_eq!(stage.stage_type, pipeline.stages[i].stage_type);
    }
    assert_eq!(result.final_output(), Some(&json!(r#"items={"items":[1,2]}!"#)));
}

#[tokio::test]
async fn concurrent_runs_keep_separate_contexts() {
    let mut registry = HandlerRegistry::new();
    registry.register("slow", Slow("slow"));
    registry.register_fn("wrap", |config| Ok(json!(config.require_str("text")?)));
    let executor = PipelineExecutor::new(Arc::new(registry));

    let a = Pipeline::parse(r#"slow --id a | wrap --text "[{{slow}}]""#).unwrap();
    let b = Pipeline::parse(r#"slow --id b | wrap --text "[{{slow}}]""#).unwrap();

    let (ra, rb) = tokio::join!(executor.execute(&a), executor.execute(&b));

    assert_eq!(ra.unwrap().final_output(), Some(&json!("[slow:a]")));
    assert_eq!(rb.unwrap().final_output(), Some(&json!("[slow:b]")));
}

#[tokio::test]
async fn shell_output_feeds_later_stage() {
    let registry = create_default_registry(&Default::default());

    let result = run_expression(
        Arc::new(registry),
        r#"shell --shell sh --command "printf 'a|b'" | echo --text "got {{shell}}""#,
    )
    .await
    .unwrap();

    assert!(result.succeeded, "{:?}", result.failure());
    assert_eq!(result.final_output(), Some(&json!("got a|b")));
}

#[test]
fn resolving_without_placeholders_is_identity() {
    let pipeline = Pipeline::parse("fetch --url http://x --raw --depth 2").unwrap();
    let config = &pipeline.stages[0].config;

    let resolved = template::resolve(config, &ExecutionContext::new()).unwrap();
    assert_eq!(&resolved, config);
}

#[test]
fn parsed_stage_shape() {
    let pipeline = Pipeline::parse(
        r#"fetch --url http://x --raw | analyze --prompt "Summarize {{fetch}}""#,
    )
    .unwrap();

    let json = serde_json::to_string_pretty(&pipeline.stages).unwrap();
    insta::assert_snapshot!(json, @r###"
    [
      {
        "type": "fetch",
        "config": {
          "url": "http://x",
          "raw": true
        }
      },
      {
        "type": "analyze",
        "config": {
          "prompt": "Summarize {{fetch}}"
        }
      }
    ]
    "###);
}
