//! # attrib
//!
//! Attributes code edits to a human or an AI agent and records them as
//! `git-ai` checkpoints.
//!
//! - `attrib serve`: stdio bridge for an editor extension
//! - `attrib checkpoint human|agent`: one-shot manual checkpoint
//! - `attrib classify`: explain the verdict for a single change
//! - `attrib policy check|show`: inspect repository patterns

mod commands;
mod host;
mod protocol;

use std::path::{Path, PathBuf};

use anyhow::Context;
use attrib_engine::AttributionConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Edit attribution for git-ai.
#[derive(Parser)]
#[command(name = "attrib", version, about)]
struct Cli {
    /// Config file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bridge an editor over stdin/stdout.
    Serve {
        /// Also attribute on-disk changes to files not open in the editor.
        #[arg(long)]
        watch: bool,
        /// Start with the agent integration considered running.
        #[arg(long)]
        assume_active: bool,
    },
    /// Record a manual checkpoint.
    Checkpoint {
        #[command(subcommand)]
        command: commands::checkpoint::CheckpointCommands,
    },
    /// Classify one change and print the signals behind the verdict.
    Classify {
        /// Inserted text (`-` reads stdin).
        #[arg(long)]
        text: String,
        /// Characters replaced by the insertion.
        #[arg(long, default_value_t = 0)]
        replaced: usize,
        /// Clipboard contents to compare against.
        #[arg(long)]
        clipboard: Option<String>,
        /// Override the configured minimum change size.
        #[arg(long)]
        min_size: Option<usize>,
    },
    /// Inspect repository allow/exclude patterns.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let (config, config_path) = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Serve {
            watch,
            assume_active,
        } => {
            commands::serve::execute(
                config,
                config_path,
                commands::serve::ServeOptions {
                    watch: *watch,
                    assume_active: *assume_active,
                },
            )
            .await
        }
        Commands::Checkpoint { command } => commands::checkpoint::execute(command, config).await,
        Commands::Classify {
            text,
            replaced,
            clipboard,
            min_size,
        } => commands::classify::execute(text, *replaced, clipboard.as_deref(), *min_size, &config),
        Commands::Policy { command } => commands::policy::execute(command, &config),
    }
}

/// Logs go to stderr; stdout carries the serve protocol.
fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("attrib_engine=info".parse()?)
        .add_directive("attrib_cli=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// An explicit `--config` must load; the default location is optional.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<(AttributionConfig, Option<PathBuf>)> {
    match explicit {
        Some(path) => {
            let config = AttributionConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            Ok((config, Some(path.to_path_buf())))
        }
        None => {
            let path = AttributionConfig::default_path();
            let config = match &path {
                Some(path) => AttributionConfig::load_or_default(path),
                None => AttributionConfig::default(),
            };
            Ok((config, path))
        }
    }
}
