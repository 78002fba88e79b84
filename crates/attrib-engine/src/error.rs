// error.rs: Error types for configuration and engine setup.
//
// Nothing on the event path returns these; they surface only from
// configuration loading, reloads and watcher setup.

use std::path::PathBuf;

use attrib_policy::PolicyError;
use thiserror::Error;

/// Errors that can occur while configuring or starting the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AttributionConfig`](crate::AttributionConfig).
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A repository policy pattern does not compile.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The file watcher could not be created or attached.
    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),
}
