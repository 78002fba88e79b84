// dispatcher.rs: Build a checkpoint payload and hand it to the runner.
//
// Dispatch is split in two halves:
//
//   1. Synchronous preparation on the caller's task: resolve the
//      repository root, apply the policy gate, compute the relative path,
//      snapshot dirty buffers and serialize the payload.
//   2. A spawned task that runs the external process and reports the
//      outcome (tracker, notification, activity count).
//
// The caller gets the task handle back and may await it; the event path
// never does. In-flight tasks are never cancelled, and concurrent
// dispatches are not ordered with respect to each other.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use attrib_checkpoint::{
    AgentCheckpoint, CheckpointError, CheckpointInvocation, CheckpointKind, CheckpointPayload,
    CheckpointPresets, CheckpointRunner, ConversationIds, DirtyFiles, HumanCheckpoint,
    RecentActivity, Transcript,
};
use attrib_classify::AttributionRange;
use attrib_policy::RepositoryPolicy;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::host::EditorHost;

/// Who the checkpoint is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Human,
    Agent { name: String },
}

impl Actor {
    pub fn agent(name: impl Into<String>) -> Self {
        Actor::Agent { name: name.into() }
    }

    pub fn kind(&self) -> CheckpointKind {
        match self {
            Actor::Human => CheckpointKind::Human,
            Actor::Agent { .. } => CheckpointKind::Agent,
        }
    }

    fn label(&self) -> &str {
        match self {
            Actor::Human => "human",
            Actor::Agent { name } => name,
        }
    }
}

/// One checkpoint to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Absolute path of the edited file.
    pub document: PathBuf,
    pub actor: Actor,
    /// Attributed span; `None` means the whole file.
    pub range: Option<AttributionRange>,
    /// Lines covered by `range`, when known.
    pub line_count: Option<usize>,
    /// Apply the repository policy gate. Manual checkpoints skip it.
    pub enforce_policy: bool,
}

/// Settings read from the live configuration for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub policy: RepositoryPolicy,
    pub presets: CheckpointPresets,
    pub model: String,
}

/// Why the pipeline stopped before spawning anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAFile,
    NoActiveDocument,
    NotActiveDocument,
    IntegrationInactive,
    NoAttributableChanges,
    DisjointRanges,
    NoisePath,
    DocumentOpen,
    NoRepositoryRoot,
    PolicyRejected,
    OutsideRepositoryRoot,
    InvalidPayload,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::NotAFile => "document is not a file",
            SkipReason::NoActiveDocument => "no active document",
            SkipReason::NotActiveDocument => "document is no longer active",
            SkipReason::IntegrationInactive => "agent integration inactive",
            SkipReason::NoAttributableChanges => "no attributable changes",
            SkipReason::DisjointRanges => "attributable changes are disjoint",
            SkipReason::NoisePath => "path is build or VCS noise",
            SkipReason::DocumentOpen => "file is open in the editor",
            SkipReason::NoRepositoryRoot => "no workspace root",
            SkipReason::PolicyRejected => "repository not allowed by policy",
            SkipReason::OutsideRepositoryRoot => "file is outside its workspace root",
            SkipReason::InvalidPayload => "payload could not be serialized",
        };
        f.write_str(s)
    }
}

/// Final result of a spawned checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Accepted,
    Rejected { exit_code: Option<i32>, stderr: String },
    /// The process could not be run (or the task died).
    Failed { reason: String },
}

impl CheckpointOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CheckpointOutcome::Accepted)
    }
}

/// What a dispatch attempt produced.
#[derive(Debug)]
pub enum Dispatch {
    Skipped(SkipReason),
    InFlight(JoinHandle<CheckpointOutcome>),
}

impl Dispatch {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Dispatch::Skipped(reason) => Some(*reason),
            Dispatch::InFlight(_) => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Dispatch::InFlight(_))
    }

    /// Wait for the checkpoint; `None` if nothing was spawned.
    pub async fn outcome(self) -> Option<CheckpointOutcome> {
        match self {
            Dispatch::Skipped(_) => None,
            Dispatch::InFlight(handle) => Some(handle.await.unwrap_or_else(|e| {
                CheckpointOutcome::Failed {
                    reason: format!("checkpoint task failed: {}", e),
                }
            })),
        }
    }
}

/// Count of spawned checkpoint tasks that have not finished.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the task ends, even by panic.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(in_flight.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Turns attribution decisions into external checkpoint processes.
pub struct CheckpointDispatcher {
    runner: Arc<dyn CheckpointRunner>,
    tracker: Arc<RecentActivity>,
    conversation_ids: ConversationIds,
    in_flight: Arc<InFlight>,
}

impl CheckpointDispatcher {
    pub fn new(
        runner: Arc<dyn CheckpointRunner>,
        tracker: Arc<RecentActivity>,
        conversation_prefix: &str,
    ) -> Self {
        Self {
            runner,
            tracker,
            conversation_ids: ConversationIds::new(conversation_prefix),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Resolve once every spawned checkpoint has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn tracker(&self) -> &Arc<RecentActivity> {
        &self.tracker
    }

    /// Prepare and spawn one checkpoint. Must be called inside a tokio runtime.
    pub fn dispatch(
        &self,
        host: &Arc<dyn EditorHost>,
        request: DispatchRequest,
        settings: &DispatchSettings,
    ) -> Dispatch {
        let Some(root) = host.workspace_root_for(&request.document) else {
            return skip(&request, SkipReason::NoRepositoryRoot);
        };

        if request.enforce_policy && !settings.policy.is_allowed(&root) {
            return skip(&request, SkipReason::PolicyRejected);
        }

        let Some(relative) = relative_path(&root, &request.document) else {
            return skip(&request, SkipReason::OutsideRepositoryRoot);
        };

        let dirty_files = snapshot_dirty_files(host.as_ref());
        let payload = match &request.actor {
            Actor::Human => CheckpointPayload::Human(HumanCheckpoint {
                repo_working_dir: root.clone(),
                will_edit_filepaths: vec![relative.clone()],
                dirty_files,
            }),
            Actor::Agent { name } => CheckpointPayload::AiAgent(AgentCheckpoint {
                repo_working_dir: root.clone(),
                edited_filepaths: vec![relative.clone()],
                dirty_files,
                transcript: Transcript::default(),
                agent_name: name.clone(),
                model: settings.model.clone(),
                conversation_id: self.conversation_ids.next(),
            }),
        };

        let invocation = match CheckpointInvocation::for_payload(&payload, &settings.presets) {
            Ok(invocation) => invocation,
            Err(e) => {
                tracing::warn!(path = %request.document.display(), error = %e, "could not build checkpoint");
                host.show_warning(&format!("git-ai checkpoint failed for {}: {}", relative, e));
                return Dispatch::Skipped(SkipReason::InvalidPayload);
            }
        };

        tracing::info!(
            kind = %invocation.kind,
            actor = request.actor.label(),
            repo = %root.display(),
            file = %relative,
            range = ?request.range,
            dirty = payload.dirty_files().len(),
            "dispatching checkpoint"
        );

        let runner = self.runner.clone();
        let tracker = self.tracker.clone();
        let host = host.clone();
        let guard = InFlightGuard::enter(&self.in_flight);
        Dispatch::InFlight(tokio::spawn(async move {
            let _guard = guard;
            let outcome = match runner.run(&invocation).await.and_then(|r| r.into_result()) {
                Ok(_) => CheckpointOutcome::Accepted,
                Err(CheckpointError::Rejected { exit_code, stderr }) => {
                    CheckpointOutcome::Rejected { exit_code, stderr }
                }
                Err(e) => CheckpointOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            report(host.as_ref(), &tracker, &request, &relative, &outcome);
            outcome
        }))
    }
}

fn skip(request: &DispatchRequest, reason: SkipReason) -> Dispatch {
    tracing::debug!(path = %request.document.display(), %reason, "checkpoint skipped");
    Dispatch::Skipped(reason)
}

fn relative_path(root: &Path, document: &Path) -> Option<String> {
    let relative = document.strip_prefix(root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative.to_string_lossy().into_owned())
}

fn snapshot_dirty_files(host: &dyn EditorHost) -> DirtyFiles {
    host.dirty_documents()
        .into_iter()
        .map(|doc| (doc.path.to_string_lossy().into_owned(), doc.text))
        .collect()
}

fn report(
    host: &dyn EditorHost,
    tracker: &RecentActivity,
    request: &DispatchRequest,
    relative: &str,
    outcome: &CheckpointOutcome,
) {
    match outcome {
        CheckpointOutcome::Accepted => {
            tracker.record_now(&request.document, request.range, request.actor.kind());
            tracing::info!(file = %relative, actor = request.actor.label(), "checkpoint accepted");
            host.show_info(&success_message(request, relative));
        }
        CheckpointOutcome::Rejected { exit_code, stderr } => {
            tracing::warn!(file = %relative, exit_code = ?exit_code, stderr = %stderr.trim(), "checkpoint rejected");
            let detail = match exit_code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            host.show_warning(&format!("git-ai checkpoint failed for {} ({})", relative, detail));
        }
        CheckpointOutcome::Failed { reason } => {
            tracing::warn!(file = %relative, %reason, "checkpoint could not run");
            host.show_warning(&format!("git-ai checkpoint failed for {}: {}", relative, reason));
        }
    }
    host.activity_changed(tracker.count());
}

fn success_message(request: &DispatchRequest, relative: &str) -> String {
    match request.line_count {
        Some(lines) => format!(
            "git-ai: checkpointed {} edit in {} → {} line{}",
            request.actor.label(),
            relative,
            lines,
            if lines == 1 { "" } else { "s" }
        ),
        None => format!(
            "git-ai: checkpointed {} edit in {}",
            request.actor.label(),
            relative
        ),
    }
}
