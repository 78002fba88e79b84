// payload.rs: Hook-input schema understood by `git-ai checkpoint`.
//
// The payload is a JSON object tagged by `type`:
//
//   {"type":"human",    "repo_working_dir": ..., "will_edit_filepaths": [...], "dirty_files": {...}}
//   {"type":"ai_agent", "repo_working_dir": ..., "edited_filepaths": [...],    "dirty_files": {...},
//    "transcript": {"messages": []}, "agent_name": ..., "model": ..., "conversation_id": ...}
//
// `dirty_files` maps an absolute document path to its full unsaved text.
// The transcript belongs to the external tool; here it is only ever the
// empty placeholder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;

/// Unsaved buffers at dispatch time: absolute path → full text.
///
/// `BTreeMap` keeps the serialized order stable.
pub type DirtyFiles = BTreeMap<String, String>;

/// Which schema a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    Human,
    Agent,
}

impl std::fmt::Display for CheckpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointKind::Human => write!(f, "human"),
            CheckpointKind::Agent => write!(f, "agent"),
        }
    }
}

/// A human is about to edit (or has edited) these files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanCheckpoint {
    pub repo_working_dir: PathBuf,
    pub will_edit_filepaths: Vec<String>,
    #[serde(default)]
    pub dirty_files: DirtyFiles,
}

impl HumanCheckpoint {
    /// A checkpoint for one repo-relative file with no dirty buffers.
    pub fn new(repo_working_dir: impl Into<PathBuf>, relative_path: impl Into<String>) -> Self {
        Self {
            repo_working_dir: repo_working_dir.into(),
            will_edit_filepaths: vec![relative_path.into()],
            dirty_files: DirtyFiles::new(),
        }
    }
}

/// Conversation transcript placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

/// An automated agent edited these files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCheckpoint {
    pub repo_working_dir: PathBuf,
    pub edited_filepaths: Vec<String>,
    #[serde(default)]
    pub dirty_files: DirtyFiles,
    pub transcript: Transcript,
    pub agent_name: String,
    pub model: String,
    pub conversation_id: String,
}

/// The hook input for one dispatch. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckpointPayload {
    Human(HumanCheckpoint),
    AiAgent(AgentCheckpoint),
}

impl CheckpointPayload {
    pub fn kind(&self) -> CheckpointKind {
        match self {
            CheckpointPayload::Human(_) => CheckpointKind::Human,
            CheckpointPayload::AiAgent(_) => CheckpointKind::Agent,
        }
    }

    pub fn repo_working_dir(&self) -> &Path {
        match self {
            CheckpointPayload::Human(h) => &h.repo_working_dir,
            CheckpointPayload::AiAgent(a) => &a.repo_working_dir,
        }
    }

    pub fn dirty_files(&self) -> &DirtyFiles {
        match self {
            CheckpointPayload::Human(h) => &h.dirty_files,
            CheckpointPayload::AiAgent(a) => &a.dirty_files,
        }
    }

    /// Serialize for `--hook-input` (single line, no pretty-printing).
    pub fn to_hook_input(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Process-unique, timestamp-derived conversation ids.
///
/// Two ids minted in the same millisecond differ by the trailing sequence
/// number. Uniqueness is only guaranteed within one process.
#[derive(Debug)]
pub struct ConversationIds {
    prefix: String,
    seq: AtomicU64,
}

impl ConversationIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> String {
        self.next_at(Utc::now().timestamp_millis())
    }

    pub fn next_at(&self, timestamp_millis: i64) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", self.prefix, timestamp_millis, seq)
    }
}
