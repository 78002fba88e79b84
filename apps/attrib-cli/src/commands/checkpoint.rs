// checkpoint.rs: One-shot manual checkpoints from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use attrib_checkpoint::{CheckpointKind, GitAiRunner};
use attrib_classify::AttributionRange;
use attrib_engine::{AttributionConfig, AttributionEngine, CheckpointOutcome};
use clap::{Args, Subcommand};

use crate::host::FileHost;

#[derive(Subcommand)]
pub enum CheckpointCommands {
    /// Record that a human is editing FILE.
    Human(CheckpointArgs),
    /// Record an agent edit of FILE (labelled `<agent>-manual`).
    Agent(CheckpointArgs),
}

#[derive(Args)]
pub struct CheckpointArgs {
    /// File to checkpoint.
    file: PathBuf,
    /// Repository root (defaults to the nearest ancestor containing `.git`).
    #[arg(long)]
    root: Option<PathBuf>,
    /// Start offset (characters) of the edited span.
    #[arg(long, requires = "end")]
    start: Option<usize>,
    /// End offset (characters) of the edited span.
    #[arg(long, requires = "start")]
    end: Option<usize>,
}

pub async fn execute(cmd: &CheckpointCommands, config: AttributionConfig) -> anyhow::Result<()> {
    let (kind, args) = match cmd {
        CheckpointCommands::Human(args) => (CheckpointKind::Human, args),
        CheckpointCommands::Agent(args) => (CheckpointKind::Agent, args),
    };

    let file = args
        .file
        .canonicalize()
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let root = match &args.root {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("cannot open {}", root.display()))?,
        None => find_repo_root(&file).with_context(|| {
            format!(
                "no git repository contains {}; pass --root",
                file.display()
            )
        })?,
    };
    if !file.starts_with(&root) {
        anyhow::bail!("{} is not inside {}", file.display(), root.display());
    }

    let runner = Arc::new(GitAiRunner::locate(&config.checkpoint.binary)?);
    let selection = match (args.start, args.end) {
        (Some(start), Some(end)) => Some(AttributionRange::new(start, end)),
        _ => None,
    };

    let host = Arc::new(FileHost::new(root, file.clone()));
    let engine = AttributionEngine::new(config, host, runner);
    let dispatch = engine.manual_checkpoint(kind, Some(file), selection);
    if let Some(reason) = dispatch.skip_reason() {
        anyhow::bail!("checkpoint skipped: {}", reason);
    }

    match dispatch.outcome().await {
        Some(CheckpointOutcome::Accepted) | None => Ok(()),
        Some(CheckpointOutcome::Rejected { exit_code, stderr }) => {
            if !stderr.trim().is_empty() {
                eprintln!("{}", stderr.trim());
            }
            anyhow::bail!(
                "git-ai rejected the checkpoint (exit code {})",
                exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
            )
        }
        Some(CheckpointOutcome::Failed { reason }) => anyhow::bail!("checkpoint failed: {}", reason),
    }
}

/// Nearest ancestor of `path` that contains a `.git` entry.
pub fn find_repo_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nearest_git_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let nested = repo.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir(repo.join(".git")).unwrap();
        let file = nested.join("a.rs");
        std::fs::write(&file, "").unwrap();

        assert_eq!(find_repo_root(&file), Some(repo.clone()));
    }

    #[test]
    fn git_file_marks_a_worktree_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: /elsewhere").unwrap();
        let file = dir.path().join("a.rs");
        assert_eq!(find_repo_root(&file), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn no_repository_means_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        // The temp dir itself may live under a repository on some machines.
        let found = find_repo_root(&file);
        assert!(found.map_or(true, |root| !root.starts_with(dir.path())));
    }
}
