//! Repository-level commands: sync, undo, and the git escape hatch.

use crate::config::Config;
use crate::error::Result;
use crate::git::Repo;
use crate::output::{emit_success, OutputOptions};

/// Exchange commits with the upstream: pull, then push. Conflicts surface
/// through git's own exit status; nothing is auto-resolved here.
pub fn sync(config: &Config, options: OutputOptions) -> Result<()> {
    let repo = Repo::ensure(&config.repo)?;
    repo.pull()?;
    repo.push()?;
    emit_success(options, "sync", &"synced", &["synced".to_string()])
}

/// Undo the last recorded change by reverting the latest commit wholesale.
pub fn undo(config: &Config, options: OutputOptions) -> Result<()> {
    let repo = Repo::ensure(&config.repo)?;
    repo.revert_head()?;
    emit_success(options, "undo", &"reverted", &["reverted last change".to_string()])
}

/// Forward arguments verbatim to git inside the task repository, exiting
/// with the child's status code.
pub fn git_passthrough(config: &Config, args: &[String]) -> Result<()> {
    let repo = Repo::ensure(&config.repo)?;
    let code = repo.run_passthrough(args)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
