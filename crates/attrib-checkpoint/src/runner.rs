// runner.rs: The external `git-ai` process boundary.
//
// Every checkpoint is one child process:
//
//   git-ai checkpoint <preset> --hook-input <json>
//
// run in the repository root. The payload travels as a single argument,
// never on stdin. Exit code 0 means accepted; anything else is a
// rejection. Output is captured for diagnostics only and never parsed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::CheckpointError;
use crate::payload::{CheckpointKind, CheckpointPayload};

/// Subcommand selectors for the two payload schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPresets {
    pub human: String,
    pub agent: String,
}

impl Default for CheckpointPresets {
    fn default() -> Self {
        Self {
            human: "human".to_string(),
            agent: "agent-v1".to_string(),
        }
    }
}

impl CheckpointPresets {
    pub fn for_kind(&self, kind: CheckpointKind) -> &str {
        match kind {
            CheckpointKind::Human => &self.human,
            CheckpointKind::Agent => &self.agent,
        }
    }
}

/// A fully prepared external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInvocation {
    pub kind: CheckpointKind,
    pub preset: String,
    pub hook_input: String,
    pub working_dir: PathBuf,
}

impl CheckpointInvocation {
    pub fn for_payload(
        payload: &CheckpointPayload,
        presets: &CheckpointPresets,
    ) -> Result<Self, CheckpointError> {
        let kind = payload.kind();
        Ok(Self {
            kind,
            preset: presets.for_kind(kind).to_string(),
            hook_input: payload.to_hook_input()?,
            working_dir: payload.repo_working_dir().to_path_buf(),
        })
    }

    /// Arguments after the program name.
    pub fn args(&self) -> [&str; 4] {
        ["checkpoint", &self.preset, "--hook-input", &self.hook_input]
    }

    /// Decode the payload back from `hook_input`.
    pub fn payload(&self) -> Result<CheckpointPayload, CheckpointError> {
        Ok(serde_json::from_str(&self.hook_input)?)
    }
}

/// What the external process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunReport {
    pub fn accepted() -> Self {
        Self {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a rejection into [`CheckpointError::Rejected`].
    pub fn into_result(self) -> Result<Self, CheckpointError> {
        if self.success() {
            Ok(self)
        } else {
            Err(CheckpointError::Rejected {
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Delivers checkpoints to the recording tool.
///
/// Implementations must not block the calling thread; the engine awaits
/// `run` from a spawned task.
#[async_trait]
pub trait CheckpointRunner: Send + Sync {
    /// Run one invocation to completion.
    ///
    /// `Err` means the process could not run at all; a process that ran and
    /// exited non-zero is an `Ok` report with `success() == false`.
    async fn run(&self, invocation: &CheckpointInvocation) -> Result<RunReport, CheckpointError>;

    /// Display name for logs.
    fn name(&self) -> &str;
}

/// Runs the real `git-ai` binary.
#[derive(Debug, Clone)]
pub struct GitAiRunner {
    program: PathBuf,
}

impl GitAiRunner {
    /// Use `program` verbatim (absolute path or a name resolved by the OS).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `binary` if possible, else fall back to the bare name so a
    /// missing tool surfaces at spawn time.
    pub fn discover(binary: &str) -> Self {
        match resolve_binary(binary) {
            Some(path) => Self::new(path),
            None => {
                tracing::warn!(binary, "checkpoint binary not found, checkpoints will fail");
                Self::new(binary)
            }
        }
    }

    /// Resolve `binary` or fail with [`CheckpointError::BinaryNotFound`].
    pub fn locate(binary: &str) -> Result<Self, CheckpointError> {
        resolve_binary(binary)
            .map(Self::new)
            .ok_or_else(|| CheckpointError::BinaryNotFound(binary.to_string()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl CheckpointRunner for GitAiRunner {
    async fn run(&self, invocation: &CheckpointInvocation) -> Result<RunReport, CheckpointError> {
        tracing::debug!(
            program = %self.program.display(),
            preset = %invocation.preset,
            cwd = %invocation.working_dir.display(),
            input_len = invocation.hook_input.len(),
            "spawning checkpoint process"
        );

        let output = Command::new(&self.program)
            .args(invocation.args())
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| CheckpointError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let report = RunReport {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !report.stdout.trim().is_empty() {
            tracing::debug!(stdout = %report.stdout.trim(), "checkpoint stdout");
        }
        if !report.stderr.trim().is_empty() {
            tracing::debug!(stderr = %report.stderr.trim(), "checkpoint stderr");
        }
        tracing::debug!(exit_code = ?report.exit_code, "checkpoint process exited");

        Ok(report)
    }

    fn name(&self) -> &str {
        "git-ai"
    }
}

/// Find the checkpoint binary.
///
/// Order: an explicit path that exists, then `PATH` (via `which`), then the
/// installer's default `~/.git-ai/bin/<binary>`.
pub fn resolve_binary(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    if let Ok(path) = which::which(binary) {
        return Some(path);
    }

    let installed = dirs::home_dir()?
        .join(".git-ai")
        .join("bin")
        .join(format!("{}{}", binary, std::env::consts::EXE_SUFFIX));
    installed.is_file().then_some(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::HumanCheckpoint;

    fn invocation(dir: &Path) -> CheckpointInvocation {
        let payload = CheckpointPayload::Human(HumanCheckpoint::new(dir, "a.txt"));
        CheckpointInvocation::for_payload(&payload, &CheckpointPresets::default()).unwrap()
    }

    #[test]
    fn invocation_uses_preset_for_kind() {
        let dir = tempfile::tempdir().unwrap();
        let inv = invocation(dir.path());
        assert_eq!(inv.kind, CheckpointKind::Human);
        assert_eq!(inv.preset, "human");
        assert_eq!(inv.working_dir, dir.path());
        let args = inv.args();
        assert_eq!(&args[..3], &["checkpoint", "human", "--hook-input"]);
        assert!(args[3].starts_with('{'));
        assert!(matches!(inv.payload().unwrap(), CheckpointPayload::Human(_)));
    }

    #[test]
    fn presets_map_kinds() {
        let presets = CheckpointPresets::default();
        assert_eq!(presets.for_kind(CheckpointKind::Agent), "agent-v1");
        assert_eq!(presets.for_kind(CheckpointKind::Human), "human");
    }

    #[test]
    fn report_into_result() {
        assert!(RunReport::accepted().into_result().is_ok());
        let rejected = RunReport {
            exit_code: Some(2),
            stdout: String::new(),
            stderr: "not a git repository\n".to_string(),
        };
        match rejected.into_result() {
            Err(CheckpointError::Rejected { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(2));
                assert!(stderr.contains("not a git repository"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn explicit_missing_path_does_not_resolve() {
        assert_eq!(resolve_binary("/definitely/not/here/git-ai"), None);
        assert!(matches!(
            GitAiRunner::locate("/definitely/not/here/git-ai"),
            Err(CheckpointError::BinaryNotFound(_))
        ));
    }

    #[test]
    fn explicit_existing_path_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("git-ai");
        std::fs::write(&bin, b"").unwrap();
        assert_eq!(resolve_binary(bin.to_str().unwrap()), Some(bin));
    }

    #[tokio::test]
    async fn missing_binary_fails_at_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let runner = GitAiRunner::new("/definitely/not/here/git-ai");
        match runner.run(&invocation(dir.path())).await {
            Err(CheckpointError::Spawn { program, .. }) => {
                assert_eq!(program, PathBuf::from("/definitely/not/here/git-ai"));
            }
            other => panic!("expected Spawn error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_zero_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let report = GitAiRunner::new("true")
            .run(&invocation(dir.path()))
            .await
            .unwrap();
        assert!(report.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let report = GitAiRunner::new("false")
            .run(&invocation(dir.path()))
            .await
            .unwrap();
        assert!(!report.success());
        assert_eq!(report.exit_code, Some(1));
    }
}
