//! Task entity: the record schema plus normalization, validation, filter
//! matching, and attribute modification.
//!
//! A task's durable identity is its UUID; the integer handle is a
//! process-local convenience re-derived on every load. The record file never
//! stores the status: the status directory the file lives in is the single
//! source of truth, so the two can never disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::query::{DueFilter, Query};
use crate::status::Status;

/// Priority levels, ordered critical-first so the derived `Ord` doubles as
/// the sort rank.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Parse a bare priority literal. Both the level names and the short
    /// `p0`..`p3` forms are accepted, case-insensitively.
    pub fn parse(token: &str) -> Option<Priority> {
        match token.to_lowercase().as_str() {
            "p0" | "critical" => Some(Priority::Critical),
            "p1" | "high" => Some(Priority::High),
            "p2" | "normal" => Some(Priority::Normal),
            "p3" | "low" => Some(Priority::Low),
            _ => None,
        }
    }

    /// Short display form.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Critical => "P0",
            Priority::High => "P1",
            Priority::Normal => "P2",
            Priority::Low => "P3",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single task record.
///
/// Serialized fields round-trip through the on-disk TOML record; `skip`
/// fields are per-process bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Permanent identity, generated once at creation and never reused.
    pub uuid: Uuid,

    /// Restored from the status directory at load time, never serialized.
    #[serde(skip)]
    pub status: Status,

    /// Process-local integer handle. Persisted so the next session can try
    /// to keep it, but authoritative only within one load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u32>,

    pub summary: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    /// Permanent identities of tasks this task depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Uuid>,

    pub created: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,

    /// Set by every mutation; save writes only pending records.
    #[serde(skip)]
    pub write_pending: bool,

    /// Soft-delete marker; the record file is removed at save time.
    #[serde(skip)]
    pub deleted: bool,

    /// Status directory this record was read from, used to delete the stale
    /// file after a status change.
    #[serde(skip)]
    pub loaded_status: Option<Status>,
}

impl Task {
    /// Create a new task in the given status with a fresh identity.
    pub fn new(status: Status, summary: impl Into<String>) -> Self {
        Task {
            uuid: Uuid::new_v4(),
            status,
            handle: None,
            summary: summary.into(),
            notes: String::new(),
            tags: Vec::new(),
            project: None,
            priority: Priority::default(),
            dependencies: Vec::new(),
            created: Utc::now(),
            modified: None,
            resolved: None,
            due: None,
            write_pending: true,
            deleted: false,
            loaded_status: None,
        }
    }

    /// Canonicalize identifier-like fields: tags and project are trimmed,
    /// lower-cased, and deduplicated; empty entries are dropped. Idempotent.
    pub fn normalise(&mut self) {
        self.summary = self.summary.trim().to_string();

        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        self.tags = tags;

        self.project = self
            .project
            .as_ref()
            .map(|project| project.trim().to_lowercase())
            .filter(|project| !project.is_empty());

        self.dependencies.sort();
        self.dependencies.dedup();
    }

    /// Check invariants without mutating. Most schema errors are made
    /// unrepresentable by the types; what remains is a nil identity or a
    /// record with no summary.
    pub fn validate(&self) -> Result<()> {
        if self.uuid.is_nil() {
            return Err(Error::InvalidTask(format!(
                "task has a nil identity: {:?}",
                self.summary
            )));
        }
        if self.summary.trim().is_empty() {
            return Err(Error::InvalidTask(format!(
                "task {} has no summary",
                self.uuid
            )));
        }
        Ok(())
    }

    /// Whether this task is compatible with every non-empty field of the
    /// query. An explicit handle list restricts matching to exactly those
    /// handles, regardless of any other predicate.
    pub fn matches(&self, query: &Query) -> bool {
        if !query.handles.is_empty() {
            return match self.handle {
                Some(handle) => query.handles.contains(&handle),
                None => false,
            };
        }

        for tag in &query.tags {
            if !self.tags.contains(tag) {
                return false;
            }
        }
        for tag in &query.anti_tags {
            if self.tags.contains(tag) {
                return false;
            }
        }

        if let Some(project) = &query.project {
            if self.project.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if query.anti_projects.contains(project) {
                return false;
            }
        }

        if let Some(due) = &query.due {
            if !self.matches_due(due) {
                return false;
            }
        }

        if let Some(priority) = query.priority {
            if self.priority != priority {
                return false;
            }
        }

        if !query.text.is_empty() {
            let needle = query.text.to_lowercase();
            let haystack = format!("{} {}", self.summary, self.notes).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }

        true
    }

    fn matches_due(&self, filter: &DueFilter) -> bool {
        let due = match self.due {
            Some(due) => due,
            None => return false,
        };
        match filter {
            DueFilter::On(date) => due.date_naive() == date.date_naive(),
            DueFilter::Before(date) => due < *date,
            DueFilter::After(date) => due > *date,
            DueFilter::Overdue => due < Utc::now(),
        }
    }

    /// Apply a query's attribute operators: add/remove tags, set or clear
    /// the project, override the priority, set the due date, and append note
    /// text. Never changes status.
    pub fn modify(&mut self, query: &Query) {
        for tag in &query.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
        self.tags.retain(|tag| !query.anti_tags.contains(tag));

        if let Some(project) = &query.project {
            self.project = Some(project.clone());
        }
        if let Some(project) = &self.project {
            if query.anti_projects.contains(project) {
                self.project = None;
            }
        }

        if let Some(priority) = query.priority {
            self.priority = priority;
        }

        if let Some(DueFilter::On(date)) = &query.due {
            self.due = Some(*date);
        }

        if !query.note.is_empty() {
            if self.notes.is_empty() {
                self.notes = query.note.clone();
            } else {
                self.notes = format!("{}\n{}", self.notes, query.note);
            }
        }

        self.normalise();
    }

    /// One-line display form used by listings.
    pub fn display_line(&self) -> String {
        let mut line = format!(
            "{:>5} {} {:<9} {}",
            self.handle.map_or_else(|| "-".to_string(), |h| h.to_string()),
            self.priority.label(),
            self.status.dir_name(),
            self.summary,
        );
        if let Some(project) = &self.project {
            line.push_str(&format!(" project:{project}"));
        }
        for tag in &self.tags {
            line.push_str(&format!(" +{tag}"));
        }
        if let Some(due) = self.due {
            line.push_str(&format!(" due:{}", due.date_naive()));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    fn task_with_tags(tags: &[&str]) -> Task {
        let mut task = Task::new(Status::Pending, "write the report");
        task.tags = tags.iter().map(|t| t.to_string()).collect();
        task
    }

    #[test]
    fn normalise_is_idempotent() {
        let mut task = task_with_tags(&["  Bug ", "bug", "", "URGENT"]);
        task.project = Some("  Work ".to_string());
        task.normalise();
        let once = task.clone();
        task.normalise();
        assert_eq!(task.tags, once.tags);
        assert_eq!(task.project, once.project);
        assert_eq!(task.tags, vec!["bug".to_string(), "urgent".to_string()]);
        assert_eq!(task.project.as_deref(), Some("work"));
    }

    #[test]
    fn validate_rejects_nil_identity_and_empty_summary() {
        let mut task = Task::new(Status::Pending, "ok");
        task.validate().expect("valid task");

        task.uuid = Uuid::nil();
        assert!(matches!(task.validate(), Err(Error::InvalidTask(_))));

        let empty = Task::new(Status::Pending, "   ");
        assert!(matches!(empty.validate(), Err(Error::InvalidTask(_))));
    }

    #[test]
    fn validate_never_mutates() {
        let task = task_with_tags(&["  Raw "]);
        let before = task.clone();
        let _ = task.validate();
        assert_eq!(task.tags, before.tags);
        assert_eq!(task.summary, before.summary);
    }

    #[test]
    fn matches_tag_subset_and_disjoint() {
        let mut task = task_with_tags(&["bug", "urgent"]);
        task.normalise();

        let mut query = Query::default();
        query.tags = vec!["bug".to_string()];
        assert!(task.matches(&query));

        query.tags = vec!["bug".to_string(), "later".to_string()];
        assert!(!task.matches(&query));

        let mut query = Query::default();
        query.anti_tags = vec!["urgent".to_string()];
        assert!(!task.matches(&query));
    }

    #[test]
    fn matches_handle_list_overrides_other_predicates() {
        let mut task = task_with_tags(&["bug"]);
        task.normalise();
        task.handle = Some(7);

        // Predicates that would otherwise exclude the task are ignored.
        let mut query = Query::default();
        query.handles = vec![7];
        query.tags = vec!["absent".to_string()];
        assert!(task.matches(&query));

        query.handles = vec![8];
        assert!(!task.matches(&query));
    }

    #[test]
    fn matches_free_text_case_insensitive() {
        let mut task = Task::new(Status::Pending, "Fix the Parser");
        task.notes = "crashes on empty input".to_string();

        let mut query = Query::default();
        query.text = "parser".to_string();
        assert!(task.matches(&query));

        query.text = "EMPTY INPUT".to_string();
        assert!(task.matches(&query));

        query.text = "printer".to_string();
        assert!(!task.matches(&query));
    }

    #[test]
    fn modify_applies_tags_project_and_note() {
        let mut task = task_with_tags(&["bug"]);
        task.normalise();
        task.project = Some("home".to_string());

        let mut query = Query::default();
        query.tags = vec!["urgent".to_string()];
        query.anti_tags = vec!["bug".to_string()];
        query.anti_projects = vec!["home".to_string()];
        query.note = "first note".to_string();
        task.modify(&query);

        assert_eq!(task.tags, vec!["urgent".to_string()]);
        assert_eq!(task.project, None);
        assert_eq!(task.notes, "first note");

        let mut second = Query::default();
        second.note = "second note".to_string();
        task.modify(&second);
        assert_eq!(task.notes, "first note\nsecond note");
    }

    #[test]
    fn modify_never_changes_status() {
        let mut task = Task::new(Status::Active, "running");
        let mut query = Query::default();
        query.priority = Some(Priority::Critical);
        task.modify(&query);
        assert_eq!(task.status, Status::Active);
        assert_eq!(task.priority, Priority::Critical);
    }

    #[test]
    fn priority_literals_parse() {
        assert_eq!(Priority::parse("P0"), Some(Priority::Critical));
        assert_eq!(Priority::parse("critical"), Some(Priority::Critical));
        assert_eq!(Priority::parse("p3"), Some(Priority::Low));
        assert_eq!(Priority::parse("urgent"), None);
    }
}
