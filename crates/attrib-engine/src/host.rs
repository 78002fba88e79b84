// host.rs: The boundary between the engine and the editor that embeds it.
//
// The engine never talks to an editor API directly. Everything it needs
// to know (workspace roots, unsaved buffers, the active document, the
// clipboard, whether the agent integration is running) is asked of an
// EditorHost, and everything it wants to tell the user goes back through
// the same trait. Hosts must answer from in-memory state; these calls
// happen on the event path.

use std::path::{Path, PathBuf};

use attrib_classify::RawChange;

/// URI scheme of a host document. Only `file` documents are attributed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentScheme {
    File,
    Untitled,
    Other(String),
}

impl DocumentScheme {
    pub fn parse(scheme: &str) -> Self {
        match scheme {
            "file" => DocumentScheme::File,
            "untitled" => DocumentScheme::Untitled,
            other => DocumentScheme::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for DocumentScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentScheme::File => write!(f, "file"),
            DocumentScheme::Untitled => write!(f, "untitled"),
            DocumentScheme::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Identity of a host document. Compared by equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub scheme: DocumentScheme,
}

impl DocumentRef {
    /// A document backed by a file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scheme: DocumentScheme::File,
        }
    }

    pub fn is_file(&self) -> bool {
        self.scheme == DocumentScheme::File
    }
}

/// One host change notification: every sub-change of one edit, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub document: DocumentRef,
    pub changes: Vec<RawChange>,
    /// Full text after the change, when the host sends it.
    pub text: Option<String>,
}

/// An unsaved buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyDocument {
    pub path: PathBuf,
    pub text: String,
}

/// Everything the engine needs from the embedding editor.
pub trait EditorHost: Send + Sync {
    /// Workspace folder containing `path`, used as the repository root.
    fn workspace_root_for(&self, path: &Path) -> Option<PathBuf>;

    /// All unsaved `file` buffers, with their full text.
    fn dirty_documents(&self) -> Vec<DirtyDocument>;

    fn is_document_open(&self, path: &Path) -> bool;

    fn active_document(&self) -> Option<DocumentRef>;

    /// Current text of an open document.
    fn document_text(&self, _path: &Path) -> Option<String> {
        None
    }

    /// Clipboard snapshot; `None` disables paste detection.
    fn clipboard_text(&self) -> Option<String>;

    /// Whether the agent integration is running in the host.
    fn integration_active(&self) -> bool;

    fn show_info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn show_warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    /// Called after every completed checkpoint with the recent-activity count.
    fn activity_changed(&self, _recent_count: usize) {}
}

/// Workspace folder set with longest-prefix root lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceFolders {
    roots: Vec<PathBuf>,
}

impl WorkspaceFolders {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn set(&mut self, roots: impl IntoIterator<Item = PathBuf>) {
        self.roots = roots.into_iter().collect();
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The innermost folder containing `path`.
    pub fn root_for(&self, path: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_parsing() {
        assert_eq!(DocumentScheme::parse("file"), DocumentScheme::File);
        assert_eq!(DocumentScheme::parse("untitled"), DocumentScheme::Untitled);
        assert_eq!(
            DocumentScheme::parse("git"),
            DocumentScheme::Other("git".to_string())
        );
        assert_eq!(DocumentScheme::parse("vscode-notebook").to_string(), "vscode-notebook");
    }

    #[test]
    fn only_file_documents_are_files() {
        assert!(DocumentRef::file("/repo/a.rs").is_file());
        let untitled = DocumentRef {
            path: PathBuf::from("Untitled-1"),
            scheme: DocumentScheme::Untitled,
        };
        assert!(!untitled.is_file());
    }

    #[test]
    fn innermost_root_wins() {
        let folders = WorkspaceFolders::new([
            PathBuf::from("/work"),
            PathBuf::from("/work/nested"),
            PathBuf::from("/other"),
        ]);
        assert_eq!(
            folders.root_for(Path::new("/work/nested/src/a.rs")),
            Some(PathBuf::from("/work/nested"))
        );
        assert_eq!(
            folders.root_for(Path::new("/work/src/a.rs")),
            Some(PathBuf::from("/work"))
        );
        assert_eq!(folders.root_for(Path::new("/elsewhere/a.rs")), None);
    }

    #[test]
    fn prefix_match_is_component_wise() {
        let folders = WorkspaceFolders::new([PathBuf::from("/work")]);
        assert_eq!(folders.root_for(Path::new("/workshop/a.rs")), None);
    }
}
