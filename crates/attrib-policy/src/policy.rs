// policy.rs: Allow/exclude evaluation for workspace roots.
//
// Evaluation order is fixed:
//
// 1. Any exclude pattern matches → Excluded
// 2. Any allow pattern matches  → Allowed
// 3. Otherwise                  → NotAllowed
//
// Patterns are plain shell globs (`glob` crate). `*` is allowed to cross
// directory separators, so the default `["*"]` admits every repository.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Glob options used for every match.
///
/// `require_literal_separator: false` lets `*` span `/`, which is what
/// makes the default allow-all pattern work on absolute paths.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Which repositories participate in attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPolicy {
    /// Repositories matching any of these globs are eligible.
    #[serde(rename = "allow", default = "default_allow")]
    pub allow_patterns: Vec<String>,

    /// Repositories matching any of these globs are never eligible.
    #[serde(rename = "exclude", default)]
    pub exclude_patterns: Vec<String>,
}

impl Default for RepositoryPolicy {
    fn default() -> Self {
        Self {
            allow_patterns: default_allow(),
            exclude_patterns: Vec::new(),
        }
    }
}

fn default_allow() -> Vec<String> {
    vec!["*".to_string()]
}

/// Outcome of evaluating a repository root against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// An allow pattern matched and no exclude did.
    Allowed { pattern: String },
    /// An exclude pattern matched.
    Excluded { pattern: String },
    /// Nothing matched.
    NotAllowed,
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allowed { .. })
    }
}

impl RepositoryPolicy {
    /// Build a policy from explicit pattern lists.
    pub fn new(allow: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            allow_patterns: allow,
            exclude_patterns: exclude,
        }
    }

    /// Whether `repo_root` is eligible for attribution.
    pub fn is_allowed(&self, repo_root: &Path) -> bool {
        self.evaluate(repo_root).is_allowed()
    }

    /// Evaluate `repo_root` and report which pattern decided.
    pub fn evaluate(&self, repo_root: &Path) -> PolicyDecision {
        let target = normalize_path(repo_root);

        if let Some(pattern) = first_match(&self.exclude_patterns, &target) {
            tracing::debug!(repo = %target, pattern = %pattern, "repository excluded");
            return PolicyDecision::Excluded {
                pattern: pattern.to_string(),
            };
        }

        if let Some(pattern) = first_match(&self.allow_patterns, &target) {
            return PolicyDecision::Allowed {
                pattern: pattern.to_string(),
            };
        }

        tracing::debug!(repo = %target, "repository not allowed");
        PolicyDecision::NotAllowed
    }

    /// Check that every pattern compiles.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for pattern in self.allow_patterns.iter().chain(&self.exclude_patterns) {
            Pattern::new(pattern).map_err(|e| PolicyError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.msg.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Render a path with forward slashes regardless of the host separator.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn first_match<'a>(patterns: &'a [String], target: &str) -> Option<&'a str> {
    patterns
        .iter()
        .map(String::as_str)
        .find(|pattern| matches_pattern(pattern, target))
}

/// Invalid patterns never match (fail-closed for allow, fail-open for exclude;
/// `validate()` is the place to catch them).
fn matches_pattern(pattern: &str, target: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches_with(target, MATCH_OPTIONS),
        Err(_) => false,
    }
}
