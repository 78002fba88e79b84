//! # attrib-checkpoint
//!
//! Everything between "this edit is attributed" and the external
//! `git-ai` recorder:
//!
//! - [`CheckpointPayload`]: the human / agent hook-input schema, serialized
//!   as JSON and passed as a single `--hook-input` argument.
//! - [`CheckpointRunner`]: async seam over the external process, with
//!   [`GitAiRunner`] as the real implementation.
//! - [`RecentActivity`]: rolling five-minute window of accepted checkpoints.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use attrib_checkpoint::{CheckpointInvocation, CheckpointPayload, CheckpointPresets,
//!     CheckpointRunner, GitAiRunner, HumanCheckpoint};
//!
//! # async fn demo() -> Result<(), attrib_checkpoint::CheckpointError> {
//! let payload = CheckpointPayload::Human(HumanCheckpoint::new("/repo", "src/main.rs"));
//! let invocation = CheckpointInvocation::for_payload(&payload, &CheckpointPresets::default())?;
//! let report = GitAiRunner::discover("git-ai").run(&invocation).await?;
//! assert!(report.success());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod payload;
pub mod recent;
pub mod runner;

pub use error::CheckpointError;
pub use payload::{
    AgentCheckpoint, CheckpointKind, CheckpointPayload, ConversationIds, DirtyFiles,
    HumanCheckpoint, Transcript,
};
pub use recent::{RecentActivity, RecentChangeRecord, RECENT_WINDOW};
pub use runner::{
    resolve_binary, CheckpointInvocation, CheckpointPresets, CheckpointRunner, GitAiRunner,
    RunReport,
};
