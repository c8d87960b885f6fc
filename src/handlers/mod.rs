// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Stage handlers
//!
//! This module provides the handler trait, the registry that maps stage
//! types to handlers, and the built-in handlers.

mod command;
mod echo;
mod json;
mod read;
mod shell;

pub use command::CommandHandler;
pub use echo::EchoHandler;
pub use json::JsonHandler;
pub use read::ReadHandler;
pub use shell::ShellHandler;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Settings;
use crate::errors::{HandlerError, StagepipeError, StagepipeResult};
use crate::pipeline::StageConfig;

/// Trait for stage handlers
///
/// A handler receives the stage's options with placeholders already
/// resolved and returns the stage output. Any resources it opens belong
/// to the handler, not to the engine.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Perform the stage's work
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError>;

    /// One-line description for listings
    fn description(&self) -> String {
        String::new()
    }
}

/// Adapter turning a closure into a handler
pub struct FnHandler<F> {
    f: F,
    description: String,
}

impl<F> FnHandler<F>
where
    F: Fn(&StageConfig) -> Result<Value, HandlerError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F> StageHandler for FnHandler<F>
where
    F: Fn(&StageConfig) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn invoke(&self, config: &StageConfig) -> Result<Value, HandlerError> {
        (self.f)(config)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Mapping from stage type to handler
///
/// Filled once at startup and only read afterwards, so a single registry
/// can be shared between concurrent runs behind an `Arc`.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StageHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a stage type, replacing any previous one
    pub fn register(&mut self, stage_type: &str, handler: impl StageHandler + 'static) {
        self.register_arc(stage_type, Arc::new(handler));
    }

    pub fn register_arc(&mut self, stage_type: &str, handler: Arc<dyn StageHandler>) {
        if self.handlers.insert(stage_type.to_string(), handler).is_some() {
            tracing::debug!(stage_type, "handler replaced");
        }
    }

    /// Register a synchronous closure
    pub fn register_fn<F>(&mut self, stage_type: &str, f: F)
    where
        F: Fn(&StageConfig) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register(stage_type, FnHandler::new(f));
    }

    /// Remove a stage type
    pub fn unregister(&mut self, stage_type: &str) -> bool {
        self.handlers.remove(stage_type).is_some()
    }

    pub fn get(&self, stage_type: &str) -> Option<&Arc<dyn StageHandler>> {
        self.handlers.get(stage_type)
    }

    pub fn has(&self, stage_type: &str) -> bool {
        self.handlers.contains_key(stage_type)
    }

    /// Look up the handler for the stage at `index`
    pub fn resolve_handler(&self, stage_type: &str, index: usize) -> StagepipeResult<Arc<dyn StageHandler>> {
        self.handlers
            .get(stage_type)
            .cloned()
            .ok_or_else(|| StagepipeError::UnknownStage {
                stage_type: stage_type.to_string(),
                index,
                available: self.stage_types().join(", "),
            })
    }

    /// Registered stage types, sorted
    pub fn stage_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Stage types with their descriptions, sorted
    pub fn describe(&self) -> Vec<(String, String)> {
        self.stage_types()
            .into_iter()
            .map(|t| {
                let description = self.handlers[&t].description();
                (t, description)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("stage_types", &self.stage_types())
            .finish()
    }
}

/// Create a registry with the built-in handlers and the command handlers
/// declared in `settings`
pub fn create_default_registry(settings: &Settings) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    registry.register("echo", EchoHandler::new());
    registry.register("json", JsonHandler::new());
    registry.register("read", ReadHandler::new());
    registry.register("shell", ShellHandler::new(&settings.shell));

    // Declared handlers may shadow built-ins
    for (name, config) in &settings.handlers {
        match CommandHandler::new(config.clone()) {
            Ok(handler) => registry.register(name, handler),
            Err(e) => tracing::warn!(stage_type = %name, error = %e, "skipping command handler"),
        }
    }

    for name in &settings.disabled {
        registry.unregister(name);
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandHandlerConfig, CommandInput};
    use serde_json::json;

    #[test]
    fn test_resolve_unknown_lists_available() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("b", |_| Ok(json!(null)));
        registry.register_fn("a", |_| Ok(json!(null)));

        let err = registry.resolve_handler("c", 2).err().unwrap();
        match err {
            StagepipeError::UnknownStage {
                stage_type,
                index,
                available,
            } => {
                assert_eq!(stage_type, "c");
                assert_eq!(index, 2);
                assert_eq!(available, "a, b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("fetch", |_| Ok(json!("x")));

        assert!(registry.has("fetch"));
        assert!(!registry.has("Fetch"));
        assert!(!registry.has("fetch "));
    }

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry(&Settings::default());
        assert_eq!(registry.stage_types(), vec!["echo", "json", "read", "shell"]);
    }

    #[test]
    fn test_disabled_builtins_are_removed() {
        let settings = Settings {
            disabled: vec!["shell".into()],
            ..Settings::default()
        };
        let registry = create_default_registry(&settings);
        assert!(!registry.has("shell"));
        assert!(registry.has("echo"));
    }

    #[test]
    fn test_unresolvable_command_handler_is_skipped() {
        let mut settings = Settings::default();
        settings.handlers.insert(
            "image-gen".into(),
            CommandHandlerConfig {
                program: "stagepipe-missing-program-xyz".into(),
                args: Vec::new(),
                input: CommandInput::Json,
                parse_json: true,
                timeout_secs: None,
                env: HashMap::new(),
                description: None,
            },
        );

        let registry = create_default_registry(&settings);
        assert!(!registry.has("image-gen"));
        assert_eq!(registry.stage_types(), vec!["echo", "json", "read", "shell"]);
    }

    #[tokio::test]
    async fn test_fn_handler_invocation() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("upper", |config| {
            Ok(json!(config.require_str("text")?.to_uppercase()))
        });

        let handler = registry.resolve_handler("upper", 0).unwrap();
        let config: StageConfig = [("text", "hi")].into_iter().collect();
        assert_eq!(handler.invoke(&config).await.unwrap(), json!("HI"));

        let err = handler.invoke(&StageConfig::new()).await.unwrap_err();
        assert!(err.message.contains("--text"));
    }
}
