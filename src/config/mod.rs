// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Settings loading
//!
//! Settings come from `.stagepipe.yaml` (or `.stagepipe.toml`) in the
//! working directory, falling back to `config.yaml` in the user's config
//! directory. Missing files mean defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{StagepipeError, StagepipeResult};

/// Project settings file names, in lookup order
pub const PROJECT_FILES: &[&str] = &[".stagepipe.yaml", ".stagepipe.yml", ".stagepipe.toml"];

/// Settings from .stagepipe.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Shell used by the `shell` stage
    #[serde(default = "default_shell")]
    pub shell: String,

    /// External command handlers, keyed by stage type
    #[serde(default)]
    pub handlers: HashMap<String, CommandHandlerConfig>,

    /// Built-in stage types to leave unregistered
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn default_shell() -> String {
    "bash".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            handlers: HashMap::new(),
            disabled: Vec::new(),
        }
    }
}

/// An external program exposed as a stage type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandHandlerConfig {
    /// Program to run (name on PATH or a path)
    pub program: String,

    /// Fixed arguments placed before the stage options
    #[serde(default)]
    pub args: Vec<String>,

    /// How stage options reach the program
    #[serde(default)]
    pub input: CommandInput,

    /// Parse stdout as JSON when possible
    #[serde(default)]
    pub parse_json: bool,

    /// Kill the program after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Shown by `stagepipe handlers`
    #[serde(default)]
    pub description: Option<String>,
}

/// Option passing convention for command handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandInput {
    /// `--name value` arguments; boolean flags become a bare `--name`
    #[default]
    Flags,
    /// A JSON object on stdin
    Json,
}

impl Settings {
    /// Load from file, choosing the format by extension
    pub fn load(path: &Path) -> StagepipeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;

        let settings: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        settings.validate()?;
        tracing::debug!(path = %path.display(), handlers = settings.handlers.len(), "loaded settings");
        Ok(settings)
    }

    /// Load from an explicit path, which must exist
    pub fn load_required(path: &Path) -> StagepipeResult<Self> {
        if !path.exists() {
            return Err(StagepipeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::load(path)
    }

    /// Find and load settings for a working directory
    pub fn discover(working_dir: &Path) -> StagepipeResult<Self> {
        match Self::find(working_dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Locate the settings file that applies to `working_dir`
    pub fn find(working_dir: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| working_dir.join(name))
            .find(|p| p.exists())
            .or_else(|| user_config_file().filter(|p| p.exists()))
    }

    /// Reject settings that cannot produce a working registry
    pub fn validate(&self) -> StagepipeResult<()> {
        if self.shell.trim().is_empty() {
            return Err(StagepipeError::InvalidConfig {
                reason: "shell must not be empty".into(),
                help: Some("Use e.g. `shell: bash`".into()),
            });
        }

        for (name, handler) in &self.handlers {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                return Err(StagepipeError::InvalidConfig {
                    reason: format!("invalid stage type name '{}'", name),
                    help: Some("Stage types may contain letters, digits, '_', '-' and '.'".into()),
                });
            }

            if handler.program.trim().is_empty() {
                return Err(StagepipeError::InvalidConfig {
                    reason: format!("handler '{}' has an empty program", name),
                    help: None,
                });
            }

            if handler.timeout_secs == Some(0) {
                return Err(StagepipeError::InvalidConfig {
                    reason: format!("handler '{}' has a zero timeout", name),
                    help: Some("Omit timeout_secs to disable the timeout".into()),
                });
            }
        }

        Ok(())
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> StagepipeResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }
}

/// `config.yaml` in the platform config directory
pub fn user_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "stagepipe", "stagepipe")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}
