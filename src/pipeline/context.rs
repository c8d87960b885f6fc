// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Per-run execution context

use std::collections::HashMap;

use serde_json::Value;

/// Outputs of completed stages, keyed by stage type
///
/// Owned by a single executor run and dropped when it ends. Only
/// successful stages are recorded; a later stage of the same type
/// replaces the earlier output.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    outputs: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed stage's output
    pub fn record(&mut self, stage_type: &str, output: Value) {
        if self.outputs.insert(stage_type.to_string(), output).is_some() {
            tracing::debug!(stage_type, "replacing earlier output of the same stage type");
        }
    }

    pub fn get(&self, stage_type: &str) -> Option<&Value> {
        self.outputs.get(stage_type)
    }

    pub fn contains(&self, stage_type: &str) -> bool {
        self.outputs.contains_key(stage_type)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ExecutionContext {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            outputs: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
