//! Configuration resolution.
//!
//! There is deliberately no process-wide mutable state: `Config` is built
//! once in the CLI layer and passed by reference into the store, state, and
//! git collaborators.

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::{Error, Result};

/// Default repository directory name under the user's home.
pub const DEFAULT_REPO_DIR: &str = ".tsk";

/// Name of the per-clone state directory under `.git/`.
pub const STATE_DIR: &str = "tsk";

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Task repository root (git-controlled, holds the status buckets).
    pub repo: PathBuf,

    /// Persisted context state file. Lives under `<repo>/.git/` so it stays
    /// per-clone and outside the tracked tree.
    pub state_file: PathBuf,
}

impl Config {
    /// Resolve configuration from an optional explicit repository path
    /// (flag or environment, already merged by clap) falling back to
    /// `~/.tsk`.
    pub fn resolve(repo: Option<PathBuf>) -> Result<Config> {
        let repo = match repo {
            Some(path) => path,
            None => {
                let base = BaseDirs::new().ok_or_else(|| {
                    Error::OperationFailed(
                        "cannot determine home directory; set --repo or TSK_REPO".to_string(),
                    )
                })?;
                base.home_dir().join(DEFAULT_REPO_DIR)
            }
        };
        let state_file = repo.join(".git").join(STATE_DIR).join("state.json");
        Ok(Config { repo, state_file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_repo_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/tasks"))).expect("resolve");
        assert_eq!(config.repo, PathBuf::from("/tmp/tasks"));
        assert_eq!(
            config.state_file,
            PathBuf::from("/tmp/tasks/.git/tsk/state.json")
        );
    }

    #[test]
    fn default_repo_is_under_home() {
        let config = Config::resolve(None).expect("resolve");
        assert!(config.repo.ends_with(DEFAULT_REPO_DIR));
    }
}
