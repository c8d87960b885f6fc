// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Placeholder resolution
//!
//! `{{stage}}` inside a text option is replaced by the recorded output of
//! the most recent `stage` run. This is plain substring substitution in a
//! single pass: substituted text is not scanned again.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::pipeline::{ConfigValue, ExecutionContext, StageConfig};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// A placeholder naming a stage type with no recorded output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPlaceholder {
    pub reference: String,
}

/// Stage types referenced by placeholders in `text`, in order of appearance
pub fn references(text: &str) -> Vec<&str> {
    placeholder_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Textual form of a stage output used for substitution
///
/// Strings are inserted as-is, `null` as nothing, anything else as
/// compact JSON.
pub fn render_output(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitute placeholders in one string
pub fn resolve_text(text: &str, context: &ExecutionContext) -> Result<String, UnresolvedPlaceholder> {
    let mut resolved = String::with_capacity(text.len());
    let mut last = 0;

    for caps in placeholder_pattern().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let output = context.get(name.as_str()).ok_or_else(|| UnresolvedPlaceholder {
            reference: name.as_str().to_string(),
        })?;

        resolved.push_str(&text[last..whole.start()]);
        resolved.push_str(&render_output(output));
        last = whole.end();

        tracing::trace!(reference = name.as_str(), "substituted placeholder");
    }

    resolved.push_str(&text[last..]);
    Ok(resolved)
}

/// Resolve every text option of a stage's config against the context
pub fn resolve(config: &StageConfig, context: &ExecutionContext) -> Result<StageConfig, UnresolvedPlaceholder> {
    let mut resolved = config.clone();

    for (_, value) in resolved.iter_mut() {
        if let ConfigValue::Text(text) = value {
            if placeholder_pattern().is_match(text) {
                *text = resolve_text(text, context)?;
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(entries: &[(&str, Value)]) -> ExecutionContext {
        entries.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_no_placeholders_is_unchanged() {
        let config: StageConfig = [
            ("url", ConfigValue::from("http://x")),
            ("raw", ConfigValue::from(true)),
            ("braces", ConfigValue::from("{not} {{ }}")),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&config, &ExecutionContext::new()).unwrap();
        assert_eq!(resolved, config);
    }

    #[test]
    fn test_substitutes_prior_output() {
        let ctx = context(&[("fetch", json!("hello"))]);
        let config: StageConfig = [("prompt", "say {{fetch}}")].into_iter().collect();

        let resolved = resolve(&config, &ctx).unwrap();
        assert_eq!(resolved.get_str("prompt"), Some("say hello"));
    }

    #[test]
    fn test_multiple_and_spaced_placeholders() {
        let ctx = context(&[("a", json!("1")), ("b", json!("2"))]);
        let out = resolve_text("{{a}}+{{ b }}={{a}}{{b}}", &ctx).unwrap();
        assert_eq!(out, "1+2=12");
    }

    #[test]
    fn test_structured_output_renders_as_json() {
        let ctx = context(&[
            ("json", json!({"k": [1, 2]})),
            ("count", json!(3)),
            ("none", Value::Null),
        ]);
        let out = resolve_text("{{json}} {{count}} [{{none}}]", &ctx).unwrap();
        assert_eq!(out, r#"{"k":[1,2]} 3 []"#);
    }

    #[test]
    fn test_missing_reference_fails() {
        let ctx = context(&[("fetch", json!("x"))]);
        let config: StageConfig = [("prompt", "{{fetch}} {{later}}")].into_iter().collect();

        let err = resolve(&config, &ctx).unwrap_err();
        assert_eq!(err.reference, "later");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let ctx = context(&[("a", json!("{{b}}"))]);
        let out = resolve_text("x {{a}} y", &ctx).unwrap();
        assert_eq!(out, "x {{b}} y");
    }

    #[test]
    fn test_flags_are_left_alone() {
        let ctx = ExecutionContext::new();
        let config: StageConfig = [("verbose", true)].into_iter().collect();
        assert_eq!(resolve(&config, &ctx).unwrap(), config);
    }

    #[test]
    fn test_references() {
        assert_eq!(references("{{a}} and {{ b.c }} but not {x}"), vec!["a", "b.c"]);
        assert!(references("plain").is_empty());
    }
}
