//! Revision-control collaborator.
//!
//! Wraps libgit2 for the operations the core consumes: open/initialize the
//! task repository, commit all pending changes with a message (suppressing
//! no-op commits), and a subprocess escape hatch for pull/push/revert and
//! arbitrary passthrough. Git output is never parsed beyond success or
//! failure.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{ErrorCode, IndexAddOption, Repository, Signature};
use tracing::debug;

use crate::error::{Error, Result};

/// Fallback committer identity when the repository has none configured.
const FALLBACK_NAME: &str = "tsk";
const FALLBACK_EMAIL: &str = "tsk@localhost";

/// Handle on the task repository.
pub struct Repo {
    repo: Repository,
    workdir: PathBuf,
}

impl Repo {
    /// Open an existing repository, failing fast when it is absent or bare.
    pub fn ensure(path: &Path) -> Result<Repo> {
        let repo = Repository::open(path).map_err(|err| {
            if err.code() == ErrorCode::NotFound {
                Error::StoreUnavailable(path.to_path_buf())
            } else {
                Error::Git(err)
            }
        })?;
        Self::wrap(repo)
    }

    /// Open the repository, initializing a fresh one when the directory has
    /// no git history yet. Used by the CLI so the first `add` bootstraps the
    /// store.
    pub fn open_or_init(path: &Path) -> Result<Repo> {
        match Repository::open(path) {
            Ok(repo) => Self::wrap(repo),
            Err(err) if err.code() == ErrorCode::NotFound => {
                std::fs::create_dir_all(path)?;
                debug!(path = %path.display(), "initializing task repository");
                Self::wrap(Repository::init(path)?)
            }
            Err(err) => Err(Error::Git(err)),
        }
    }

    fn wrap(repo: Repository) -> Result<Repo> {
        let workdir = repo
            .workdir()
            .map(|path| path.to_path_buf())
            .ok_or_else(|| {
                Error::OperationFailed("bare repositories are not supported".to_string())
            })?;
        Ok(Repo { repo, workdir })
    }

    /// Path to the working tree root.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Stage all working-tree changes and commit them with the given
    /// message. Returns false, without committing, when there is nothing to
    /// commit.
    pub fn commit_all(&self, message: &str) -> Result<bool> {
        let mut index = self.repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(err) if err.code() == ErrorCode::UnbornBranch => None,
            Err(err) if err.code() == ErrorCode::NotFound => None,
            Err(err) => return Err(Error::Git(err)),
        };

        // Suppress no-op commits: an unchanged tree means nothing to record.
        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                debug!("working tree clean, skipping commit");
                return Ok(false);
            }
        }

        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        debug!(message, "committed pending changes");
        Ok(true)
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            Err(_) => Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?),
        }
    }

    /// Run an arbitrary git command in the repository, inheriting stdio.
    /// Returns the child's exit code.
    pub fn run_passthrough(&self, args: &[String]) -> Result<i32> {
        let status = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .status()?;
        Ok(status.code().unwrap_or(1))
    }

    fn run_checked(&self, args: &[&str]) -> Result<()> {
        let rendered = args.join(" ");
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let code = self.run_passthrough(&args)?;
        if code != 0 {
            return Err(Error::OperationFailed(format!(
                "git {rendered} exited with status {code}"
            )));
        }
        Ok(())
    }

    /// Fetch and integrate upstream changes.
    pub fn pull(&self) -> Result<()> {
        self.run_checked(&["pull", "--no-rebase", "--no-edit"])
    }

    /// Publish local commits.
    pub fn push(&self) -> Result<()> {
        self.run_checked(&["push"])
    }

    /// Revert the most recent commit wholesale. This is the undo path: the
    /// revision history is the source of truth, so undo restores a prior
    /// revision rather than performing targeted rollback.
    pub fn revert_head(&self) -> Result<()> {
        self.run_checked(&["revert", "--no-edit", "HEAD"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn ensure_fails_fast_on_missing_repository() {
        let dir = TempDir::new().expect("tempdir");
        assert!(matches!(
            Repo::ensure(&dir.path().join("absent")),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[test]
    fn open_or_init_bootstraps_and_reopens() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("repo");

        let repo = Repo::open_or_init(&path).expect("init");
        assert!(path.join(".git").exists());
        drop(repo);

        Repo::ensure(&path).expect("reopen existing");
    }

    #[test]
    fn commit_all_suppresses_no_op_commits() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repo::open_or_init(dir.path()).expect("init");

        fs::write(dir.path().join("record.toml"), "summary = \"x\"\n").expect("write");
        assert!(repo.commit_all("Added: x").expect("first commit"));

        // Nothing changed since the last commit.
        assert!(!repo.commit_all("noop").expect("second commit"));

        fs::write(dir.path().join("record.toml"), "summary = \"y\"\n").expect("write");
        assert!(repo.commit_all("Modified: y").expect("third commit"));
    }

    #[test]
    fn commit_all_records_deletions() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repo::open_or_init(dir.path()).expect("init");

        let path = dir.path().join("record.toml");
        fs::write(&path, "summary = \"x\"\n").expect("write");
        repo.commit_all("Added: x").expect("commit");

        fs::remove_file(&path).expect("remove");
        assert!(repo.commit_all("Removed: x").expect("commit deletion"));
        assert!(!repo.commit_all("noop").expect("clean"));
    }
}
