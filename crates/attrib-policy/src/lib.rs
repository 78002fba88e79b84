//! # attrib-policy
//!
//! Repository policy for edit attribution.
//!
//! A [`RepositoryPolicy`] decides whether a workspace root participates in
//! attribution at all. It holds two ordered lists of shell globs:
//!
//! - **exclude** patterns always win: any match rejects the repository.
//! - **allow** patterns admit the repository when no exclude matched.
//! - Anything else is rejected.
//!
//! The default policy is allow-all (`["*"]`) with no excludes.
//! Paths are normalized to forward slashes before matching, so a single
//! pattern set works on every host operating system.

pub mod error;
pub mod policy;

pub use error::PolicyError;
pub use policy::{normalize_path, PolicyDecision, RepositoryPolicy};
