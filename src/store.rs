//! Record store: one TOML file per task inside a status-named directory.
//!
//! # Directory Structure
//!
//! ```text
//! <repo>/                        # git-controlled task repository
//!   pending/<uuid>.toml
//!   active/<uuid>.toml
//!   paused/<uuid>.toml
//!   delegated/<uuid>.toml
//!   deferred/<uuid>.toml
//!   recurring/<uuid>.toml
//!   template/<uuid>.toml
//!   resolved/<uuid>.toml
//! ```
//!
//! Saves touch only records marked pending, which bounds the blast radius of
//! each command to exactly what it changed. Load and save are not
//! transactional across files; an interrupted save is recovered through the
//! repository's revision history, not by this layer.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::status::Status;
use crate::task::Task;
use crate::taskset::TaskSet;

/// File extension for task records.
pub const RECORD_EXT: &str = "toml";

/// Store manager bound to one task repository.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a store for the configured repository.
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.repo.clone(),
        }
    }

    /// Path to the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to a status bucket directory.
    pub fn status_dir(&self, status: Status) -> PathBuf {
        self.root.join(status.dir_name())
    }

    /// Path to the record file for a given identity and status.
    pub fn record_path(&self, status: Status, uuid: &Uuid) -> PathBuf {
        self.status_dir(status).join(format!("{uuid}.{RECORD_EXT}"))
    }

    /// Create the repository directory. Status buckets are created lazily on
    /// first write.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Read every task whose status is in the requested set.
    ///
    /// Fails with `StoreUnavailable` when the repository root is missing and
    /// `CorruptRecord` (with the offending path) when a file does not parse.
    pub fn load(&self, statuses: &[Status]) -> Result<Vec<Task>> {
        if !self.root.is_dir() {
            return Err(Error::StoreUnavailable(self.root.clone()));
        }

        let mut tasks = Vec::new();
        for &status in statuses {
            let dir = self.status_dir(status);
            if !dir.is_dir() {
                continue;
            }
            let mut entries: Vec<PathBuf> = fs::read_dir(&dir)
                .map_err(|_| Error::StoreUnavailable(dir.clone()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == RECORD_EXT))
                .collect();
            // Deterministic load order keeps handle allocation stable
            // across invocations.
            entries.sort();

            for path in entries {
                tasks.push(self.read_record(&path, status)?);
            }
        }
        debug!(count = tasks.len(), "loaded task records");
        Ok(tasks)
    }

    fn read_record(&self, path: &Path, status: Status) -> Result<Task> {
        let content = fs::read_to_string(path).map_err(|err| Error::CorruptRecord {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let mut task: Task = toml::from_str(&content).map_err(|err| Error::CorruptRecord {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        task.status = status;
        task.loaded_status = Some(status);
        Ok(task)
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Write every task marked pending to the path implied by its current
    /// status, removing stale records left in a previous status bucket and
    /// the records of soft-deleted tasks. Unmodified records are never
    /// rewritten.
    ///
    /// Returns the paths touched, for the revision commit; empty means the
    /// caller must not request a commit.
    pub fn save_pending(&self, tasks: &mut TaskSet) -> Result<Vec<PathBuf>> {
        let mut touched = Vec::new();

        for task in tasks.tasks_mut() {
            if !task.write_pending {
                continue;
            }

            if task.deleted {
                if let Some(previous) = task.loaded_status {
                    let stale = self.record_path(previous, &task.uuid);
                    if stale.exists() {
                        fs::remove_file(&stale)?;
                        touched.push(stale);
                    }
                }
                task.write_pending = false;
                continue;
            }

            let path = self.write_record(task)?;
            touched.push(path);

            if let Some(previous) = task.loaded_status {
                if previous != task.status {
                    let stale = self.record_path(previous, &task.uuid);
                    if stale.exists() {
                        fs::remove_file(&stale)?;
                        touched.push(stale);
                    }
                }
            }

            task.loaded_status = Some(task.status);
            task.write_pending = false;
        }

        debug!(count = touched.len(), "saved pending task records");
        Ok(touched)
    }

    /// Serialize one record and write it atomically.
    fn write_record(&self, task: &Task) -> Result<PathBuf> {
        let path = self.record_path(task.status, &task.uuid);
        let serialized = toml::to_string_pretty(task)?;
        write_atomic(&path, serialized.as_bytes())?;
        Ok(path)
    }
}

/// Write data using temp file + rename so a record is either fully written
/// or not at all.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
