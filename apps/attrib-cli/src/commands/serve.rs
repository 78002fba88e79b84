// serve.rs: `attrib serve`, the stdio bridge an editor extension talks to.
//
// Reads HostMessage lines from stdin until EOF or `shutdown`, mirrors
// editor state into a StdioHost and feeds change events to the engine.
// Notifications and status updates go back on stdout. On exit the
// pending debounce is cancelled and running checkpoints are awaited.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use attrib_checkpoint::GitAiRunner;
use attrib_classify::AttributionRange;
use attrib_engine::{
    forward_file_changes, AttributionConfig, AttributionEngine, ChangeEvent, DocumentRef,
    DocumentScheme, EditorHost, PathWatcher,
};
use notify::RecursiveMode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::host::{StdioHost, SystemClipboard};
use crate::protocol::{self, EngineMessage, HostMessage};

pub struct ServeOptions {
    /// Attribute on-disk changes to files that are not open.
    pub watch: bool,
    /// Treat the agent integration as running until the editor says otherwise.
    pub assume_active: bool,
}

/// A watcher and the task draining it. Dropping stops both.
struct Background {
    _watcher: PathWatcher,
    task: JoinHandle<()>,
}

impl Drop for Background {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn execute(
    config: AttributionConfig,
    config_path: Option<PathBuf>,
    options: ServeOptions,
) -> anyhow::Result<()> {
    let (outbox, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_messages(out_rx));

    let host = Arc::new(StdioHost::new(
        Box::new(SystemClipboard::open()),
        outbox,
        options.assume_active,
    ));
    let runner = Arc::new(GitAiRunner::discover(&config.checkpoint.binary));
    tracing::info!(program = %runner.program().display(), "using checkpoint binary");
    let quiet = config.debounce();
    let engine = AttributionEngine::new(config, host.clone(), runner);

    let config_reload = match &config_path {
        Some(path) => watch_config(engine.clone(), path.clone())?,
        None => None,
    };
    let mut file_watch: Option<Background> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read host messages from stdin")?
    {
        let message = match protocol::parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed host message");
                continue;
            }
        };

        match message {
            HostMessage::Shutdown => break,
            HostMessage::WorkspaceFolders { folders } => {
                host.set_workspace_folders(folders);
                if options.watch {
                    drop(file_watch.take());
                    file_watch = watch_workspace(&engine, &host.workspace_folders(), quiet);
                }
            }
            other => handle_message(&engine, &host, other),
        }
    }

    tracing::info!("host disconnected, shutting down");
    engine.shutdown();
    drop(file_watch);
    drop(config_reload);
    engine.wait_idle().await;
    host.close_output();

    writer
        .await
        .context("output writer task failed")?
        .context("failed to write to stdout")?;
    Ok(())
}

/// Apply one editor message to the mirrored state and the engine.
fn handle_message(engine: &AttributionEngine, host: &StdioHost, message: HostMessage) {
    match message {
        HostMessage::WorkspaceFolders { folders } => host.set_workspace_folders(folders),
        HostMessage::DocumentOpened { path, text, scheme } => {
            host.document_opened(path, text, DocumentScheme::parse(&scheme))
        }
        HostMessage::DocumentChanged {
            path,
            scheme,
            changes,
            text,
            dirty,
        } => {
            let document = DocumentRef {
                path,
                scheme: DocumentScheme::parse(&scheme),
            };
            host.document_changed(&document, &changes, text.clone(), dirty);
            engine.on_document_changed(ChangeEvent {
                document,
                changes,
                text,
            });
        }
        HostMessage::DocumentSaved { path } => host.document_saved(&path),
        HostMessage::DocumentClosed { path } => host.document_closed(&path),
        HostMessage::ActiveDocument { path } => host.set_active_document(path),
        HostMessage::IntegrationStatus { active } => {
            tracing::info!(active, "agent integration status changed");
            host.set_integration_active(active);
        }
        HostMessage::ManualCheckpoint {
            kind,
            path,
            selection,
        } => {
            let selection = selection.map(|r| AttributionRange::new(r.start_offset, r.end_offset));
            if let Some(reason) = engine.manual_checkpoint(kind, path, selection).skip_reason() {
                host.show_warning(&format!("git-ai: {} checkpoint skipped ({})", kind, reason));
            }
        }
        HostMessage::Shutdown => {}
    }
}

fn watch_workspace(
    engine: &AttributionEngine,
    folders: &[PathBuf],
    quiet: Duration,
) -> Option<Background> {
    if folders.is_empty() {
        return None;
    }
    match PathWatcher::new(folders, RecursiveMode::Recursive) {
        Ok((watcher, rx)) => {
            tracing::info!(folders = watcher.watched().len(), "watching workspace for external edits");
            let task = tokio::spawn(forward_file_changes(engine.clone(), rx, quiet));
            Some(Background {
                _watcher: watcher,
                task,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not watch workspace folders");
            None
        }
    }
}

/// Reload the config file whenever it changes.
fn watch_config(engine: AttributionEngine, path: PathBuf) -> anyhow::Result<Option<Background>> {
    let Some(dir) = path.parent().filter(|dir| dir.is_dir()) else {
        tracing::debug!(path = %path.display(), "config directory missing, not watching for reloads");
        return Ok(None);
    };
    let (watcher, mut rx) = PathWatcher::new(&[dir.to_path_buf()], RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;

    let task = tokio::spawn(async move {
        while let Some(changed) = rx.recv().await {
            if changed.file_name() == path.file_name() {
                reload_config(&engine, &path);
            }
        }
    });
    Ok(Some(Background {
        _watcher: watcher,
        task,
    }))
}

fn reload_config(engine: &AttributionEngine, path: &Path) {
    match AttributionConfig::load(path) {
        Ok(config) if config == engine.config() => {}
        Ok(config) => {
            if let Err(e) = engine.update_config(config) {
                tracing::warn!(error = %e, "rejected reloaded configuration");
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config reload failed, keeping previous configuration");
        }
    }
}

async fn write_messages(mut rx: mpsc::UnboundedReceiver<EngineMessage>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        match message.to_line() {
            Ok(line) => {
                stdout.write_all(line.as_bytes()).await?;
                stdout.flush().await?;
            }
            Err(e) => tracing::warn!(error = %e, "could not encode message"),
        }
    }
    Ok(())
}
