//! Persisted per-clone state: the current context query.
//!
//! Loaded and saved at most once per invocation. A missing or corrupt state
//! file is an empty context, never a fatal error.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::query::Query;

/// Process-local persisted state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct State {
    /// The persisted context query merged into most commands.
    #[serde(default)]
    pub context: Query,
}

impl State {
    /// Load state from disk, treating missing or unparseable files as empty.
    pub fn load(path: &Path) -> State {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return State::default(),
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                debug!(path = %path.display(), %err, "ignoring corrupt state file");
                State::default()
            }
        }
    }

    /// Save state, creating parent directories as needed. Temp file + rename
    /// so readers never see a partial write.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}
