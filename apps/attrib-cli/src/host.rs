// host.rs: EditorHost implementations for the binary.
//
// - StdioHost mirrors the editor's state from protocol messages and sends
//   notifications back as EngineMessage lines.
// - FileHost backs one-shot `attrib checkpoint` runs: one file, one root,
//   nothing unsaved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use attrib_classify::RawChange;
use attrib_engine::{DirtyDocument, DocumentRef, DocumentScheme, EditorHost, WorkspaceFolders};
use tokio::sync::mpsc;

use crate::protocol::{EngineMessage, NotificationLevel};

/// Read-only clipboard access.
pub trait ClipboardSource: Send + Sync {
    fn read_text(&self) -> Option<String>;
}

/// The OS clipboard via arboard. Headless sessions have none.
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn open() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                tracing::info!(error = %e, "clipboard unavailable, paste detection disabled");
                None
            }
        };
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&self) -> Option<String> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut()?.get_text() {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(error = %e, "clipboard read failed");
                None
            }
        }
    }
}

/// No clipboard at all.
pub struct NoClipboard;

impl ClipboardSource for NoClipboard {
    fn read_text(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
struct OpenDocument {
    scheme: DocumentScheme,
    /// `None` once the mirror can no longer vouch for the buffer contents.
    text: Option<String>,
    dirty: bool,
}

#[derive(Debug, Default)]
struct EditorState {
    folders: WorkspaceFolders,
    documents: HashMap<PathBuf, OpenDocument>,
    active: Option<DocumentRef>,
    integration_active: bool,
}

/// Editor state mirrored from the stdio protocol.
pub struct StdioHost {
    state: Mutex<EditorState>,
    clipboard: Box<dyn ClipboardSource>,
    outbox: Mutex<Option<mpsc::UnboundedSender<EngineMessage>>>,
}

impl StdioHost {
    pub fn new(
        clipboard: Box<dyn ClipboardSource>,
        outbox: mpsc::UnboundedSender<EngineMessage>,
        integration_active: bool,
    ) -> Self {
        Self {
            state: Mutex::new(EditorState {
                integration_active,
                ..EditorState::default()
            }),
            clipboard,
            outbox: Mutex::new(Some(outbox)),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("host state lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn send(&self, message: EngineMessage) {
        let outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        let delivered = outbox
            .as_ref()
            .is_some_and(|tx| tx.send(message).is_ok());
        if !delivered {
            tracing::debug!("output closed, dropping message");
        }
    }

    /// Stop sending; the output writer finishes once it drains.
    pub fn close_output(&self) {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn set_workspace_folders(&self, folders: Vec<PathBuf>) {
        self.state().folders.set(folders);
    }

    pub fn workspace_folders(&self) -> Vec<PathBuf> {
        self.state().folders.roots().to_vec()
    }

    pub fn document_opened(&self, path: PathBuf, text: String, scheme: DocumentScheme) {
        self.state().documents.insert(
            path,
            OpenDocument {
                scheme,
                text: Some(text),
                dirty: false,
            },
        );
    }

    /// Record a change. Unknown documents are opened implicitly.
    ///
    /// Without a full `text` the changes are replayed onto the mirrored
    /// buffer in order. A document whose contents were never sent stays
    /// unknown and is left out of dirty snapshots.
    pub fn document_changed(
        &self,
        document: &DocumentRef,
        changes: &[RawChange],
        text: Option<String>,
        dirty: Option<bool>,
    ) {
        let mut state = self.state();
        let entry = state
            .documents
            .entry(document.path.clone())
            .or_insert_with(|| OpenDocument {
                scheme: document.scheme.clone(),
                text: None,
                dirty: false,
            });
        entry.text = match text {
            Some(text) => Some(text),
            None => entry
                .text
                .take()
                .and_then(|current| apply_changes(current, changes)),
        };
        if entry.text.is_none() {
            tracing::debug!(path = %document.path.display(), "document text unknown, omitting from dirty snapshots");
        }
        entry.dirty = dirty.unwrap_or(true);
    }

    pub fn document_saved(&self, path: &Path) {
        if let Some(doc) = self.state().documents.get_mut(path) {
            doc.dirty = false;
        }
    }

    pub fn document_closed(&self, path: &Path) {
        let mut state = self.state();
        state.documents.remove(path);
        if state.active.as_ref().is_some_and(|a| a.path == path) {
            state.active = None;
        }
    }

    pub fn set_active_document(&self, path: Option<PathBuf>) {
        let mut state = self.state();
        let active = path.map(|path| {
            let scheme = state
                .documents
                .get(&path)
                .map(|d| d.scheme.clone())
                .unwrap_or(DocumentScheme::File);
            DocumentRef { path, scheme }
        });
        state.active = active;
    }

    pub fn set_integration_active(&self, active: bool) {
        self.state().integration_active = active;
    }
}

impl EditorHost for StdioHost {
    fn workspace_root_for(&self, path: &Path) -> Option<PathBuf> {
        self.state().folders.root_for(path)
    }

    fn dirty_documents(&self) -> Vec<DirtyDocument> {
        self.state()
            .documents
            .iter()
            .filter(|(_, doc)| doc.dirty && doc.scheme == DocumentScheme::File)
            .filter_map(|(path, doc)| {
                Some(DirtyDocument {
                    path: path.clone(),
                    text: doc.text.clone()?,
                })
            })
            .collect()
    }

    fn is_document_open(&self, path: &Path) -> bool {
        self.state().documents.contains_key(path)
    }

    fn active_document(&self) -> Option<DocumentRef> {
        self.state().active.clone()
    }

    fn document_text(&self, path: &Path) -> Option<String> {
        self.state().documents.get(path)?.text.clone()
    }

    fn clipboard_text(&self) -> Option<String> {
        self.clipboard.read_text()
    }

    fn integration_active(&self) -> bool {
        self.state().integration_active
    }

    fn show_info(&self, message: &str) {
        tracing::info!("{}", message);
        self.send(EngineMessage::Notification {
            level: NotificationLevel::Info,
            message: message.to_string(),
        });
    }

    fn show_warning(&self, message: &str) {
        tracing::warn!("{}", message);
        self.send(EngineMessage::Notification {
            level: NotificationLevel::Warning,
            message: message.to_string(),
        });
    }

    fn activity_changed(&self, recent_count: usize) {
        self.send(EngineMessage::Status { recent_count });
    }
}

/// Replay `changes` onto `text`. Offsets count characters, and each
/// change applies to the text left by the previous one. `None` when a
/// change falls outside the buffer.
fn apply_changes(text: String, changes: &[RawChange]) -> Option<String> {
    changes.iter().try_fold(text, |text, change| {
        let start = byte_offset(&text, change.start_offset)?;
        let end = start + byte_offset(&text[start..], change.replaced_length)?;
        let mut next = String::with_capacity(text.len() + change.inserted_text.len());
        next.push_str(&text[..start]);
        next.push_str(&change.inserted_text);
        next.push_str(&text[end..]);
        Some(next)
    })
}

fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(chars)
}

/// Host for a single on-disk file outside any editor.
pub struct FileHost {
    root: PathBuf,
    document: PathBuf,
}

impl FileHost {
    pub fn new(root: PathBuf, document: PathBuf) -> Self {
        Self { root, document }
    }
}

impl EditorHost for FileHost {
    fn workspace_root_for(&self, path: &Path) -> Option<PathBuf> {
        path.starts_with(&self.root).then(|| self.root.clone())
    }

    fn dirty_documents(&self) -> Vec<DirtyDocument> {
        Vec::new()
    }

    fn is_document_open(&self, _path: &Path) -> bool {
        false
    }

    fn active_document(&self) -> Option<DocumentRef> {
        Some(DocumentRef::file(&self.document))
    }

    fn document_text(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn clipboard_text(&self) -> Option<String> {
        None
    }

    fn integration_active(&self) -> bool {
        true
    }

    fn show_info(&self, message: &str) {
        println!("{}", message);
    }

    fn show_warning(&self, message: &str) {
        eprintln!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> (StdioHost, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StdioHost::new(Box::new(NoClipboard), tx, true), rx)
    }

    #[test]
    fn tracks_dirty_state_through_edit_and_save() {
        let (host, _rx) = host();
        let path = PathBuf::from("/r/a.rs");
        host.document_opened(path.clone(), "fn a() {}".to_string(), DocumentScheme::File);
        assert!(host.dirty_documents().is_empty());
        assert!(host.is_document_open(&path));

        host.document_changed(&DocumentRef::file(&path), &[], Some("fn b() {}".to_string()), None);
        assert_eq!(
            host.dirty_documents(),
            vec![DirtyDocument {
                path: path.clone(),
                text: "fn b() {}".to_string()
            }]
        );

        host.document_saved(&path);
        assert!(host.dirty_documents().is_empty());
        assert_eq!(host.document_text(&path).as_deref(), Some("fn b() {}"));
    }

    #[test]
    fn changes_without_text_are_replayed_onto_the_buffer() {
        let (host, _rx) = host();
        let path = PathBuf::from("/r/a.rs");
        host.document_opened(path.clone(), "fn a() {}".to_string(), DocumentScheme::File);

        // "fn a() {}" -> "fn ab() {}" -> "fn ab() { x }"
        let changes = [RawChange::new("b", 0, 4), RawChange::new(" x ", 0, 9)];
        host.document_changed(&DocumentRef::file(&path), &changes, None, None);
        assert_eq!(
            host.dirty_documents(),
            vec![DirtyDocument {
                path: path.clone(),
                text: "fn ab() { x }".to_string()
            }]
        );

        // Replacement counted in characters, not bytes.
        host.document_changed(&DocumentRef::file(&path), &[RawChange::new("é", 2, 3)], None, None);
        assert_eq!(host.document_text(&path).as_deref(), Some("fn é() { x }"));
        host.document_changed(&DocumentRef::file(&path), &[RawChange::new("ü", 1, 3)], None, None);
        assert_eq!(host.document_text(&path).as_deref(), Some("fn ü() { x }"));
    }

    #[test]
    fn documents_with_unknown_text_are_left_out_of_snapshots() {
        let (host, _rx) = host();
        let opened = PathBuf::from("/r/a.rs");
        let unopened = PathBuf::from("/r/b.rs");
        host.document_opened(opened.clone(), "fn a() {}".to_string(), DocumentScheme::File);

        host.document_changed(&DocumentRef::file(&unopened), &[RawChange::new("x", 0, 0)], None, None);
        host.document_changed(&DocumentRef::file(&opened), &[RawChange::new("x", 0, 50)], None, None);

        assert!(host.is_document_open(&unopened));
        assert!(host.dirty_documents().is_empty());
        assert_eq!(host.document_text(&opened), None);

        // A full text resynchronizes the mirror.
        host.document_changed(&DocumentRef::file(&opened), &[], Some("fn c() {}".to_string()), None);
        assert_eq!(host.dirty_documents().len(), 1);
    }

    #[test]
    fn untitled_buffers_are_never_dirty_files() {
        let (host, _rx) = host();
        let doc = DocumentRef {
            path: PathBuf::from("Untitled-1"),
            scheme: DocumentScheme::Untitled,
        };
        host.document_changed(&doc, &[], Some("scratch".to_string()), Some(true));
        assert!(host.dirty_documents().is_empty());
    }

    #[test]
    fn closing_the_active_document_clears_it() {
        let (host, _rx) = host();
        let path = PathBuf::from("/r/a.rs");
        host.document_opened(path.clone(), String::new(), DocumentScheme::File);
        host.set_active_document(Some(path.clone()));
        assert_eq!(host.active_document(), Some(DocumentRef::file(&path)));

        host.document_closed(&path);
        assert_eq!(host.active_document(), None);
        assert!(!host.is_document_open(&path));
    }

    #[test]
    fn active_document_keeps_its_scheme() {
        let (host, _rx) = host();
        let path = PathBuf::from("Untitled-2");
        host.document_opened(path.clone(), String::new(), DocumentScheme::Untitled);
        host.set_active_document(Some(path));
        assert!(!host.active_document().unwrap().is_file());
    }

    #[test]
    fn notifications_go_to_the_outbox() {
        let (host, mut rx) = host();
        host.show_info("checkpointed");
        host.show_warning("failed");
        host.activity_changed(2);
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineMessage::Notification {
                level: NotificationLevel::Info,
                message: "checkpointed".to_string()
            }
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineMessage::Notification {
                level: NotificationLevel::Warning,
                ..
            }
        ));
        assert_eq!(rx.try_recv().unwrap(), EngineMessage::Status { recent_count: 2 });

        host.close_output();
        host.show_info("dropped");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn workspace_roots_and_integration_flag() {
        let (host, _rx) = host();
        host.set_workspace_folders(vec![PathBuf::from("/r")]);
        assert_eq!(
            host.workspace_root_for(Path::new("/r/src/a.rs")),
            Some(PathBuf::from("/r"))
        );
        assert_eq!(host.workspace_folders(), vec![PathBuf::from("/r")]);
        assert!(host.integration_active());
        host.set_integration_active(false);
        assert!(!host.integration_active());
    }

    #[test]
    fn file_host_scopes_to_its_root() {
        let host = FileHost::new(PathBuf::from("/r"), PathBuf::from("/r/a.rs"));
        assert_eq!(
            host.workspace_root_for(Path::new("/r/a.rs")),
            Some(PathBuf::from("/r"))
        );
        assert_eq!(host.workspace_root_for(Path::new("/x/a.rs")), None);
        assert!(host.dirty_documents().is_empty());
        assert_eq!(host.active_document(), Some(DocumentRef::file("/r/a.rs")));
    }
}
