// policy.rs: Policy subcommands: check, show.

use std::path::PathBuf;

use attrib_engine::AttributionConfig;
use attrib_policy::{normalize_path, PolicyDecision};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Report whether a repository root participates in attribution.
    Check {
        /// Repository root to evaluate.
        path: PathBuf,
    },
    /// Print the active allow and exclude patterns.
    Show,
}

pub fn execute(cmd: &PolicyCommands, config: &AttributionConfig) -> anyhow::Result<()> {
    let policy = &config.repositories;
    match cmd {
        PolicyCommands::Check { path } => {
            let path = path.canonicalize().unwrap_or_else(|_| path.clone());
            let decision = policy.evaluate(&path);
            println!("{}", describe(&normalize_path(&path), &decision));
        }
        PolicyCommands::Show => {
            println!("allow:");
            for pattern in &policy.allow_patterns {
                println!("  {}", pattern);
            }
            println!("exclude:");
            if policy.exclude_patterns.is_empty() {
                println!("  (none)");
            }
            for pattern in &policy.exclude_patterns {
                println!("  {}", pattern);
            }
        }
    }
    Ok(())
}

fn describe(path: &str, decision: &PolicyDecision) -> String {
    match decision {
        PolicyDecision::Allowed { pattern } => format!("{}: allowed (matches '{}')", path, pattern),
        PolicyDecision::Excluded { pattern } => {
            format!("{}: rejected (excluded by '{}')", path, pattern)
        }
        PolicyDecision::NotAllowed => format!("{}: rejected (no allow pattern matches)", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrib_policy::RepositoryPolicy;
    use std::path::Path;

    #[test]
    fn describes_each_decision() {
        let policy = RepositoryPolicy::new(vec!["*".into()], vec!["/repo/secret*".into()]);
        assert_eq!(
            describe("/repo/src/x", &policy.evaluate(Path::new("/repo/src/x"))),
            "/repo/src/x: allowed (matches '*')"
        );
        assert_eq!(
            describe("/repo/secret/x", &policy.evaluate(Path::new("/repo/secret/x"))),
            "/repo/secret/x: rejected (excluded by '/repo/secret*')"
        );
        assert_eq!(
            describe("/r", &PolicyDecision::NotAllowed),
            "/r: rejected (no allow pattern matches)"
        );
    }
}
