//! Derived per-project aggregates.
//!
//! Projects are never persisted independently; every summary is computed
//! fresh from the current task set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::status::Status;
use crate::taskset::TaskSet;

/// Aggregated view over tasks sharing a project name.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    /// Open (non-resolved) task count.
    pub open: usize,
    pub resolved: usize,
    /// Whether any task in the project is currently active.
    pub active: bool,
    /// Earliest creation time across the project.
    pub created: DateTime<Utc>,
    /// Latest resolution time, when any task has resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_resolved: Option<DateTime<Utc>>,
}

/// Compute summaries for every project present in the task set, sorted by
/// name.
pub fn summarize(tasks: &TaskSet) -> Vec<ProjectSummary> {
    let mut projects: BTreeMap<String, ProjectSummary> = BTreeMap::new();

    for task in tasks.all_tasks() {
        let name = match &task.project {
            Some(name) => name.clone(),
            None => continue,
        };
        let entry = projects.entry(name.clone()).or_insert_with(|| ProjectSummary {
            name,
            open: 0,
            resolved: 0,
            active: false,
            created: task.created,
            last_resolved: None,
        });

        if task.status == Status::Resolved {
            entry.resolved += 1;
            if entry.last_resolved < task.resolved {
                entry.last_resolved = task.resolved;
            }
        } else {
            entry.open += 1;
        }
        if task.status == Status::Active {
            entry.active = true;
        }
        if task.created < entry.created {
            entry.created = task.created;
        }
    }

    projects.into_values().collect()
}
