// error.rs: Error types for checkpoint construction and delivery.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or delivering a checkpoint.
///
/// None of these are fatal to an editing session: the engine turns every
/// one of them into a warning and moves on.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The payload could not be serialized to JSON.
    #[error("failed to serialize checkpoint payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The external process could not be started (missing binary, bad cwd, ...).
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The external process ran and refused the checkpoint.
    #[error("checkpoint rejected (exit code {}): {}", describe_exit(.exit_code), .stderr.trim())]
    Rejected {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The checkpoint binary could not be found on PATH or in its install location.
    #[error("checkpoint binary '{0}' not found on PATH or in ~/.git-ai/bin")]
    BinaryNotFound(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none, terminated by signal".to_string(),
    }
}
