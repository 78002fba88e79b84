//! File system watching for edits made outside the editor.
//!
//! [`PathWatcher`] bridges `notify`'s callback thread into a tokio channel
//! of changed paths. [`forward_file_changes`] drains that channel with a
//! short quiet period, de-duplicates paths and feeds each one to
//! [`AttributionEngine::on_file_changed`].

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::engine::AttributionEngine;
use crate::error::EngineError;

/// Path components whose files are never attributed.
pub const NOISE_COMPONENTS: &[&str] = &["node_modules", ".git", "out"];

/// Whether `path` lies in a dependency, VCS or build-output directory.
pub fn is_noise_path(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| NOISE_COMPONENTS.contains(&name)),
        _ => false,
    })
}

/// Whether a notify event is a content change worth reporting.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Keeps a notify watcher alive and exposes its changes on a channel.
pub struct PathWatcher {
    _watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl PathWatcher {
    /// Watch `paths` and send every created or modified path.
    pub fn new(
        paths: &[PathBuf],
        mode: RecursiveMode,
    ) -> Result<(Self, mpsc::Receiver<PathBuf>), EngineError> {
        let (tx, rx) = mpsc::channel::<PathBuf>(256);

        let mut watcher = recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) if is_content_change(&event.kind) => {
                for path in event.paths {
                    // Runs on notify's thread, outside the runtime.
                    if tx.blocking_send(path).is_err() {
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "file watch error"),
        })?;

        let mut watched = Vec::new();
        for path in paths {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "not watching missing path");
                continue;
            }
            watcher.watch(path, mode)?;
            tracing::debug!(path = %path.display(), "watching");
            watched.push(path.clone());
        }

        Ok((
            Self {
                _watcher: watcher,
                watched,
            },
            rx,
        ))
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Feed changed files into the engine until the channel closes.
///
/// Each burst is collected until `quiet` passes without new events, then
/// every distinct regular file in it is dispatched once.
pub async fn forward_file_changes(
    engine: AttributionEngine,
    mut rx: mpsc::Receiver<PathBuf>,
    quiet: Duration,
) {
    while let Some(first) = rx.recv().await {
        let mut burst = BTreeSet::from([first]);
        loop {
            match tokio::time::timeout(quiet, rx.recv()).await {
                Ok(Some(path)) => {
                    burst.insert(path);
                }
                Ok(None) => {
                    dispatch_burst(&engine, burst);
                    return;
                }
                Err(_) => break,
            }
        }
        dispatch_burst(&engine, burst);
    }
}

fn dispatch_burst(engine: &AttributionEngine, burst: BTreeSet<PathBuf>) {
    for path in burst {
        if !path.is_file() {
            continue;
        }
        // The dispatch task reports its own outcome.
        let _ = engine.on_file_changed(&path);
    }
}
