// protocol.rs: Newline-delimited JSON spoken with the editor on stdio.
//
// Every line is one object tagged by `type`. The editor sends
// HostMessage lines on stdin; the bridge answers with EngineMessage lines
// on stdout. Logs never go to stdout.

use std::path::PathBuf;

use attrib_checkpoint::CheckpointKind;
use attrib_classify::{AttributionRange, RawChange};
use serde::{Deserialize, Serialize};

/// Editor → bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    WorkspaceFolders {
        folders: Vec<PathBuf>,
    },
    DocumentOpened {
        path: PathBuf,
        #[serde(default)]
        text: String,
        #[serde(default = "default_scheme")]
        scheme: String,
    },
    DocumentChanged {
        path: PathBuf,
        #[serde(default = "default_scheme")]
        scheme: String,
        changes: Vec<RawChange>,
        /// Full text after the change.
        #[serde(default)]
        text: Option<String>,
        /// Unsaved state after the change; a change implies dirty when absent.
        #[serde(default)]
        dirty: Option<bool>,
    },
    DocumentSaved {
        path: PathBuf,
    },
    DocumentClosed {
        path: PathBuf,
    },
    ActiveDocument {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    IntegrationStatus {
        active: bool,
    },
    ManualCheckpoint {
        kind: CheckpointKind,
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        selection: Option<AttributionRange>,
    },
    Shutdown,
}

fn default_scheme() -> String {
    "file".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
}

/// Bridge → editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineMessage {
    Notification {
        level: NotificationLevel,
        message: String,
    },
    Status {
        recent_count: usize,
    },
}

impl EngineMessage {
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> serde_json::Result<Option<HostMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}
