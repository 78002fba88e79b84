// error.rs: Error types for repository policy validation.

use thiserror::Error;

/// Errors raised while validating a repository policy.
///
/// Evaluation itself never fails: an invalid pattern simply never matches.
/// Validation exists so configuration loading can reject typos up front.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A pattern could not be compiled as a glob.
    #[error("invalid repository pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
