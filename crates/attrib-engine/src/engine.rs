// engine.rs: The attribution pipeline.
//
//   host change event
//     → DebounceCoalescer (last event of a burst)
//     → gates: file scheme, still active, integration running
//     → classify_batch (one clipboard snapshot)
//     → merge_ranges
//     → CheckpointDispatcher (root, policy, payload, spawn)
//     → RecentActivity
//
// The engine owns all of its state; nothing here is process-global.
// Configuration sits behind a lock and is re-read on every evaluation so
// edits to the config file apply without a restart.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use attrib_checkpoint::{CheckpointKind, CheckpointRunner, RecentActivity};
use attrib_classify::{
    attributable_ranges, classify_batch, merge_ranges, AttributionRange, LineIndex,
};

use crate::config::AttributionConfig;
use crate::debounce::DebounceCoalescer;
use crate::dispatcher::{
    Actor, CheckpointDispatcher, Dispatch, DispatchRequest, DispatchSettings, SkipReason,
};
use crate::error::EngineError;
use crate::host::{ChangeEvent, EditorHost};
use crate::watch::is_noise_path;

/// Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct AttributionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: RwLock<AttributionConfig>,
    host: Arc<dyn EditorHost>,
    dispatcher: CheckpointDispatcher,
    coalescer: DebounceCoalescer,
}

impl AttributionEngine {
    pub fn new(
        config: AttributionConfig,
        host: Arc<dyn EditorHost>,
        runner: Arc<dyn CheckpointRunner>,
    ) -> Self {
        let dispatcher = CheckpointDispatcher::new(
            runner,
            Arc::new(RecentActivity::new()),
            &config.checkpoint.conversation_prefix,
        );
        let coalescer = DebounceCoalescer::new(config.debounce());
        Self {
            inner: Arc::new(EngineInner {
                config: RwLock::new(config),
                host,
                dispatcher,
                coalescer,
            }),
        }
    }

    /// Snapshot of the live configuration.
    pub fn config(&self) -> AttributionConfig {
        self.inner.config()
    }

    /// Validate and swap in a new configuration.
    pub fn update_config(&self, config: AttributionConfig) -> Result<(), EngineError> {
        config.validate()?;
        *self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
        tracing::info!("configuration updated");
        Ok(())
    }

    /// Host change notification. Schedules a debounced evaluation.
    ///
    /// Non-file documents and empty change lists are dropped immediately.
    /// Must be called inside a tokio runtime.
    pub fn on_document_changed(&self, event: ChangeEvent) {
        if !event.document.is_file() {
            tracing::trace!(scheme = %event.document.scheme, "ignoring non-file document");
            return;
        }
        if event.changes.is_empty() {
            return;
        }
        let delay = self.inner.config().debounce();
        let engine = self.clone();
        self.inner.coalescer.schedule_in(delay, move || {
            // The dispatch task reports its own outcome.
            let _ = engine.evaluate_now(&event);
        });
    }

    /// Run the pipeline for `event` immediately, bypassing the debounce.
    pub fn evaluate_now(&self, event: &ChangeEvent) -> Dispatch {
        let inner = &self.inner;
        let document = &event.document;

        if !document.is_file() {
            return skipped(&document.path, SkipReason::NotAFile);
        }
        if inner.host.active_document().as_ref() != Some(document) {
            return skipped(&document.path, SkipReason::NotActiveDocument);
        }
        if !inner.host.integration_active() {
            return skipped(&document.path, SkipReason::IntegrationInactive);
        }

        let config = inner.config();
        let clipboard = inner.host.clipboard_text();
        let verdicts = classify_batch(&event.changes, &config.classifier(), clipboard.as_deref());
        let candidates = attributable_ranges(&verdicts);
        if candidates.is_empty() {
            return skipped(&document.path, SkipReason::NoAttributableChanges);
        }
        let Some(range) = merge_ranges(&candidates) else {
            return skipped(&document.path, SkipReason::DisjointRanges);
        };
        tracing::debug!(path = %document.path.display(), ?range, candidates = candidates.len(), "merged attribution range");

        let line_count = event.text.as_deref().map(|text| line_count(text, range));
        inner.dispatch(
            DispatchRequest {
                document: document.path.clone(),
                actor: Actor::agent(config.agent_name.clone()),
                range: Some(range),
                line_count,
                enforce_policy: true,
            },
            &config,
        )
    }

    /// A file changed on disk outside the editor.
    ///
    /// Files open in the host are left to the change-event path.
    pub fn on_file_changed(&self, path: &Path) -> Dispatch {
        let inner = &self.inner;
        if !inner.host.integration_active() {
            return skipped(path, SkipReason::IntegrationInactive);
        }
        if is_noise_path(path) {
            return skipped(path, SkipReason::NoisePath);
        }
        if inner.host.is_document_open(path) {
            return skipped(path, SkipReason::DocumentOpen);
        }
        let config = inner.config();
        inner.dispatch(
            DispatchRequest {
                document: path.to_path_buf(),
                actor: Actor::agent(config.agent_name.clone()),
                range: None,
                line_count: None,
                enforce_policy: true,
            },
            &config,
        )
    }

    /// Manual human checkpoint of the active document.
    pub fn manual_human_checkpoint(&self, selection: Option<AttributionRange>) -> Dispatch {
        self.manual_checkpoint(CheckpointKind::Human, None, selection)
    }

    /// Manual agent checkpoint of the active document, as `<agent>-manual`.
    pub fn manual_agent_checkpoint(&self) -> Dispatch {
        self.manual_checkpoint(CheckpointKind::Agent, None, None)
    }

    /// Manual checkpoint of `document`, or of the active document when `None`.
    ///
    /// Bypasses the integration and policy gates.
    pub fn manual_checkpoint(
        &self,
        kind: CheckpointKind,
        document: Option<PathBuf>,
        selection: Option<AttributionRange>,
    ) -> Dispatch {
        let inner = &self.inner;
        let path = match document {
            Some(path) => path,
            None => match inner.host.active_document() {
                Some(active) if active.is_file() => active.path,
                Some(active) => return skipped(&active.path, SkipReason::NotAFile),
                None => {
                    tracing::debug!("manual checkpoint without an active document");
                    return Dispatch::Skipped(SkipReason::NoActiveDocument);
                }
            },
        };

        let config = inner.config();
        let actor = match kind {
            CheckpointKind::Human => Actor::Human,
            CheckpointKind::Agent => Actor::agent(config.manual_agent_name()),
        };
        let line_count = selection.and_then(|range| {
            inner
                .host
                .document_text(&path)
                .map(|text| line_count(&text, range))
        });
        inner.dispatch(
            DispatchRequest {
                document: path,
                actor,
                range: selection,
                line_count,
                enforce_policy: false,
            },
            &config,
        )
    }

    /// Accepted checkpoints in the last five minutes.
    pub fn recent_count(&self) -> usize {
        self.inner.dispatcher.tracker().count()
    }

    /// Checkpoint processes spawned but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.dispatcher.in_flight()
    }

    /// Wait until no checkpoint process is running.
    pub async fn wait_idle(&self) {
        self.inner.dispatcher.wait_idle().await
    }

    pub fn has_pending_evaluation(&self) -> bool {
        self.inner.coalescer.has_pending()
    }

    /// Drop any pending evaluation. In-flight checkpoints run to completion.
    pub fn shutdown(&self) {
        if self.inner.coalescer.cancel() {
            tracing::debug!("cancelled pending evaluation on shutdown");
        }
    }
}

impl EngineInner {
    fn config(&self) -> AttributionConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn dispatch(&self, request: DispatchRequest, config: &AttributionConfig) -> Dispatch {
        let settings = DispatchSettings {
            policy: config.repositories.clone(),
            presets: config.presets(),
            model: config.model.clone(),
        };
        self.dispatcher.dispatch(&self.host, request, &settings)
    }
}

fn skipped(path: &Path, reason: SkipReason) -> Dispatch {
    tracing::debug!(path = %path.display(), %reason, "evaluation skipped");
    Dispatch::Skipped(reason)
}

fn line_count(text: &str, range: AttributionRange) -> usize {
    LineIndex::new(text).span(range).line_count()
}
