// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Pipeline definition structures
//!
//! A [`Pipeline`] is produced once from an inline expression and never
//! mutated afterwards.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Parsed pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Diagnostic label derived from the expression
    pub name: String,

    /// Stages in textual order
    pub stages: Vec<StageDescriptor>,
}

impl Pipeline {
    /// Parse an inline pipeline expression
    pub fn parse(expression: &str) -> crate::StagepipeResult<Self> {
        super::parser::parse(expression)
    }

    /// Get all stage types, in order
    pub fn stage_types(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.stage_type.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// A single pipe-delimited segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Stage type identifier, used for handler lookup and placeholders
    #[serde(rename = "type")]
    pub stage_type: String,

    /// Options given as `--name value`
    pub config: StageConfig,
}

impl StageDescriptor {
    pub fn new(stage_type: impl Into<String>) -> Self {
        Self {
            stage_type: stage_type.into(),
            config: StageConfig::new(),
        }
    }

    /// Builder-style option setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.config.insert(name, value);
        self
    }
}

/// Option value as written in the expression
///
/// Values stay raw strings; coercion is up to the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// `--name value`
    Text(String),
    /// `--name` with no value
    Flag(bool),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Flag(_) => None,
        }
    }

    /// Interpret as a boolean (`true`/`false`/`yes`/`no`/`1`/`0` for text)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Text(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Flag(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

/// Stage options, in the order they were written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageConfig(IndexMap<String, ConfigValue>);

impl StageConfig {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert an option; a repeated name replaces the earlier value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.0.get(name)
    }

    /// Get a text option
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ConfigValue::as_str)
    }

    /// Get a boolean option; absent means `false`
    pub fn flag(&self, name: &str) -> bool {
        self.0
            .get(name)
            .and_then(ConfigValue::as_bool)
            .unwrap_or(false)
    }

    /// Get a required text option
    pub fn require_str(&self, name: &str) -> Result<&str, crate::errors::HandlerError> {
        self.get_str(name)
            .ok_or_else(|| crate::errors::HandlerError::missing_option(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ConfigValue)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a JSON object (flags become booleans)
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        ConfigValue::Text(s) => serde_json::Value::String(s.clone()),
                        ConfigValue::Flag(b) => serde_json::Value::Bool(*b),
                    };
                    (k.clone(), value)
                })
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for StageConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (k, v) in iter {
            config.insert(k, v);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_keeps_insertion_order() {
        let config: StageConfig = [("b", "2"), ("a", "1")].into_iter().collect();
        let keys: Vec<_> = config.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_repeated_option_last_wins() {
        let mut config = StageConfig::new();
        config.insert("x", "first");
        config.insert("x", "second");
        assert_eq!(config.len(), 1);
        assert_eq!(config.get_str("x"), Some("second"));
    }

    #[test]
    fn test_flags() {
        let stage = StageDescriptor::new("shell")
            .with("quiet", true)
            .with("trim", "no");
        assert!(stage.config.flag("quiet"));
        assert!(!stage.config.flag("trim"));
        assert!(!stage.config.flag("missing"));
        assert_eq!(stage.config.get_str("quiet"), None);
    }

    #[test]
    fn test_to_json() {
        let config: StageConfig = [
            ("url", ConfigValue::from("http://x")),
            ("raw", ConfigValue::from(true)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            config.to_json(),
            serde_json::json!({ "url": "http://x", "raw": true })
        );
    }
}
