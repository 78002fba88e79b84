//! Attribution configuration structures

use std::path::{Path, PathBuf};
use std::time::Duration;

use attrib_checkpoint::CheckpointPresets;
use attrib_classify::ClassifierConfig;
use attrib_policy::RepositoryPolicy;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Top-level configuration from `<config_dir>/attrib/config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// Agent identity used for automatic checkpoints
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Model label written into agent checkpoints
    #[serde(default = "default_model")]
    pub model: String,

    /// Minimum inserted length (characters) for an attributable change
    #[serde(default = "default_min_change_size")]
    pub min_change_size: usize,

    /// Quiet period before a burst of edits is evaluated
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Which repositories participate
    #[serde(default)]
    pub repositories: RepositoryPolicy,

    /// External tool settings
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            model: default_model(),
            min_change_size: default_min_change_size(),
            debounce_ms: default_debounce_ms(),
            repositories: RepositoryPolicy::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

/// Checkpoint tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Program name (looked up on PATH) or absolute path
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Preset passed for human checkpoints
    #[serde(default = "default_human_preset")]
    pub human_preset: String,

    /// Preset passed for agent checkpoints
    #[serde(default = "default_agent_preset")]
    pub agent_preset: String,

    /// Prefix of generated conversation ids
    #[serde(default = "default_conversation_prefix")]
    pub conversation_prefix: String,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            human_preset: default_human_preset(),
            agent_preset: default_agent_preset(),
            conversation_prefix: default_conversation_prefix(),
        }
    }
}

// Serde default functions
fn default_agent_name() -> String {
    "amazon-q".to_string()
}

fn default_model() -> String {
    "amazon-q-unknown-model".to_string()
}

fn default_min_change_size() -> usize {
    3
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_binary() -> String {
    "git-ai".to_string()
}

fn default_human_preset() -> String {
    "human".to_string()
}

fn default_agent_preset() -> String {
    "agent-v1".to_string()
}

fn default_conversation_prefix() -> String {
    "editor".to_string()
}

impl AttributionConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse and validate TOML text. `origin` is only used in errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(content).map_err(|source| EngineError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Try to load config, returning defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(EngineError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// `<config_dir>/attrib/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("attrib").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_change_size == 0 {
            return Err(EngineError::InvalidConfig(
                "min_change_size must be at least 1".to_string(),
            ));
        }
        if self.debounce_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "debounce_ms must be at least 1".to_string(),
            ));
        }
        if self.agent_name.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "agent_name must not be empty".to_string(),
            ));
        }
        if self.checkpoint.binary.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "checkpoint.binary must not be empty".to_string(),
            ));
        }
        self.repositories.validate()?;
        Ok(())
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            min_change_size: self.min_change_size,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn presets(&self) -> CheckpointPresets {
        CheckpointPresets {
            human: self.checkpoint.human_preset.clone(),
            agent: self.checkpoint.agent_preset.clone(),
        }
    }

    /// Agent name for manually requested agent checkpoints.
    pub fn manual_agent_name(&self) -> String {
        format!("{}-manual", self.agent_name)
    }
}
