//! Shared output formatting for tsk CLI commands.
//!
//! Table rendering and color styling are deliberately out of scope; listings
//! are plain lines, with a JSON envelope behind `--json`.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::Task;

pub const SCHEMA_VERSION: &str = "tsk.v1";

/// Per-invocation output switches.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Serializable projection of a task for `--json` listings. The entity
/// itself skips status (implied by the record path), so listings carry it
/// explicitly.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub handle: Option<u32>,
    pub uuid: String,
    pub status: String,
    pub priority: String,
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        TaskView {
            handle: task.handle,
            uuid: task.uuid.to_string(),
            status: task.status.dir_name().to_string(),
            priority: task.priority.label().to_string(),
            summary: task.summary.clone(),
            notes: task.notes.clone(),
            tags: task.tags.clone(),
            project: task.project.clone(),
            due: task.due.map(|due| due.date_naive().to_string()),
        }
    }
}

/// Emit a successful result: a JSON envelope under `--json`, otherwise the
/// prepared human lines (suppressed by `--quiet`).
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    lines: &[String],
) -> Result<()> {
    if options.json {
        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Emit an error to stderr, as JSON when requested.
pub fn emit_error(err: &Error, json: bool) {
    if json {
        let payload = crate::error::JsonError::from(err);
        match serde_json::to_string_pretty(&payload) {
            Ok(rendered) => eprintln!("{rendered}"),
            Err(_) => eprintln!("{err}"),
        }
        return;
    }
    eprintln!("error: {err}");
}

/// Render a listing of tasks, one line each, in view order.
pub fn task_lines<'a>(tasks: impl Iterator<Item = &'a Task>) -> Vec<String> {
    tasks.map(|task| task.display_line()).collect()
}
