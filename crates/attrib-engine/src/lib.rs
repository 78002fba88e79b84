//! # attrib-engine
//!
//! The edit attribution pipeline. An [`AttributionEngine`] receives raw
//! document changes from an [`EditorHost`], decides whether a burst of
//! changes looks agent-authored and, if so, delivers a checkpoint to the
//! external recorder through a [`CheckpointRunner`](attrib_checkpoint::CheckpointRunner).
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attrib_checkpoint::GitAiRunner;
//! use attrib_engine::{AttributionConfig, AttributionEngine, EditorHost};
//!
//! # fn demo(host: Arc<dyn EditorHost>) {
//! let config = AttributionConfig::default();
//! let runner = Arc::new(GitAiRunner::discover(&config.checkpoint.binary));
//! let engine = AttributionEngine::new(config, host, runner);
//! assert_eq!(engine.recent_count(), 0);
//! # }
//! ```

pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod host;
pub mod watch;

pub use config::{AttributionConfig, CheckpointConfig};
pub use debounce::DebounceCoalescer;
pub use dispatcher::{
    Actor, CheckpointDispatcher, CheckpointOutcome, Dispatch, DispatchRequest, DispatchSettings,
    SkipReason,
};
pub use engine::AttributionEngine;
pub use error::EngineError;
pub use host::{ChangeEvent, DirtyDocument, DocumentRef, DocumentScheme, EditorHost, WorkspaceFolders};
pub use watch::{forward_file_changes, is_noise_path, PathWatcher, NOISE_COMPONENTS};
