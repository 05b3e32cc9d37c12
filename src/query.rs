//! Query model: the structured predicate parsed from command-line tokens,
//! the closed set of command kinds, and the context merge rules.
//!
//! Parsing is a single left-to-right stateful scan. Structural tokens are
//! matched case-insensitively; free text and note text keep their original
//! case and order.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::Priority;

/// Closed set of command kinds. Dispatch over this enum is exhaustive at
/// compile time; there is no runtime default case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CmdKind {
    Next,
    Add,
    Template,
    Remove,
    Start,
    Stop,
    Done,
    Modify,
    Note,
    Context,
    ShowOpen,
    ShowActive,
    ShowPaused,
    ShowResolved,
    ShowTemplates,
    ShowProjects,
    ShowTags,
    Sync,
    Undo,
    Git,
    Version,
}

/// Command name table, including aliases. First entry per kind is the
/// canonical name.
const COMMANDS: [(&str, CmdKind); 25] = [
    ("next", CmdKind::Next),
    ("add", CmdKind::Add),
    ("template", CmdKind::Template),
    ("remove", CmdKind::Remove),
    ("rm", CmdKind::Remove),
    ("start", CmdKind::Start),
    ("stop", CmdKind::Stop),
    ("done", CmdKind::Done),
    ("resolve", CmdKind::Done),
    ("modify", CmdKind::Modify),
    ("note", CmdKind::Note),
    ("annotate", CmdKind::Note),
    ("context", CmdKind::Context),
    ("show-open", CmdKind::ShowOpen),
    ("ls", CmdKind::ShowOpen),
    ("show-active", CmdKind::ShowActive),
    ("show-paused", CmdKind::ShowPaused),
    ("show-resolved", CmdKind::ShowResolved),
    ("show-templates", CmdKind::ShowTemplates),
    ("show-projects", CmdKind::ShowProjects),
    ("show-tags", CmdKind::ShowTags),
    ("sync", CmdKind::Sync),
    ("undo", CmdKind::Undo),
    ("git", CmdKind::Git),
    ("version", CmdKind::Version),
];

impl CmdKind {
    /// Look up a command name, case-insensitively.
    pub fn parse(token: &str) -> Option<CmdKind> {
        COMMANDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, kind)| *kind)
    }

    /// Canonical name for display.
    pub fn name(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("next")
    }
}

/// Due-date filter modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DueFilter {
    /// Due on this calendar day.
    On(DateTime<Utc>),
    Before(DateTime<Utc>),
    After(DateTime<Utc>),
    /// Due date in the past.
    Overdue,
}

impl std::fmt::Display for DueFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DueFilter::On(date) => write!(f, "due:{}", date.date_naive()),
            DueFilter::Before(date) => write!(f, "due.before:{}", date.date_naive()),
            DueFilter::After(date) => write!(f, "due.after:{}", date.date_naive()),
            DueFilter::Overdue => write!(f, "due.overdue"),
        }
    }
}

/// A structured selection/mutation predicate.
///
/// Serializable because the persisted context is just a stored `Query`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<CmdKind>,

    /// Explicit integer handles. Non-empty means "exactly these tasks".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handles: Vec<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anti_tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anti_projects: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DueFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Template handle reference from a `template:N` token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<u32>,

    /// Free text, space-joined in original order.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    /// Note text accumulated after a `/` token, uninterpreted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,

    /// Set by a `--` token: skip the persisted context for this invocation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_context: bool,
}

impl Query {
    /// Parse command-line tokens into a query. Single pass, stateful:
    /// leading integers are handles until the first non-integer, non-command
    /// token permanently closes handle parsing; `/` switches the rest of the
    /// tokens into note accumulation.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Query> {
        let mut query = Query::default();
        let mut ids_exhausted = false;
        let mut note_mode = false;
        let mut text = Vec::new();
        let mut note = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            if note_mode {
                note.push(token.to_string());
                continue;
            }

            if !ids_exhausted {
                if let Ok(handle) = token.parse::<u32>() {
                    query.handles.push(handle);
                    continue;
                }
            }

            // A command token neither closes handle parsing nor consumes
            // more than the first match.
            if query.cmd.is_none() {
                if let Some(kind) = CmdKind::parse(token) {
                    query.cmd = Some(kind);
                    continue;
                }
            }

            ids_exhausted = true;
            let lower = token.to_lowercase();

            if token == "--" {
                query.ignore_context = true;
                continue;
            }
            if token == "/" {
                note_mode = true;
                continue;
            }

            if let Some(project) = lower
                .strip_prefix("project:")
                .or_else(|| lower.strip_prefix("+project:"))
            {
                if query.project.is_none() {
                    query.project = Some(project.to_string());
                }
                continue;
            }
            if let Some(project) = lower.strip_prefix("-project:") {
                query.anti_projects.push(project.to_string());
                continue;
            }

            if let Some(filter) = parse_due_token(&lower)? {
                if query.due.is_some() {
                    return Err(Error::DuplicateDueFilter(token.to_string()));
                }
                query.due = Some(filter);
                continue;
            }

            if let Some(reference) = lower.strip_prefix("template:") {
                if let Ok(handle) = reference.parse::<u32>() {
                    query.template = Some(handle);
                    continue;
                }
            }

            if let Some(tag) = lower.strip_prefix('+') {
                if !tag.is_empty() {
                    query.tags.push(tag.to_string());
                    continue;
                }
            }
            if let Some(tag) = lower.strip_prefix('-') {
                if !tag.is_empty() {
                    query.anti_tags.push(tag.to_string());
                    continue;
                }
            }

            if let Some(priority) = Priority::parse(&lower) {
                if query.priority.is_none() {
                    query.priority = Some(priority);
                }
                continue;
            }

            text.push(token.to_string());
        }

        query.text = text.join(" ");
        query.note = note.join(" ");
        Ok(query)
    }

    /// Merge the persisted context into this (command-line) query.
    ///
    /// Tag sets union. Project, due filter, and priority must be unset here
    /// or identical to the context's value; a differing value is a conflict,
    /// never a silent override. An identical due filter merges cleanly even
    /// though a duplicate due token within one parse is rejected.
    pub fn merge_context(&self, context: &Query) -> Result<Query> {
        let mut merged = self.clone();

        for tag in &context.tags {
            if !merged.tags.contains(tag) {
                merged.tags.push(tag.clone());
            }
        }
        for tag in &context.anti_tags {
            if !merged.anti_tags.contains(tag) {
                merged.anti_tags.push(tag.clone());
            }
        }
        for project in &context.anti_projects {
            if !merged.anti_projects.contains(project) {
                merged.anti_projects.push(project.clone());
            }
        }

        if let Some(project) = &context.project {
            match &merged.project {
                None => merged.project = Some(project.clone()),
                Some(existing) if existing == project => {}
                Some(existing) => {
                    return Err(Error::ConflictingContext {
                        field: "project",
                        context: project.clone(),
                        query: existing.clone(),
                    });
                }
            }
        }

        if let Some(due) = &context.due {
            match &merged.due {
                None => merged.due = Some(*due),
                Some(existing) if existing == due => {}
                Some(existing) => {
                    return Err(Error::ConflictingContext {
                        field: "due",
                        context: due.to_string(),
                        query: existing.to_string(),
                    });
                }
            }
        }

        if let Some(priority) = context.priority {
            match merged.priority {
                None => merged.priority = Some(priority),
                Some(existing) if existing == priority => {}
                Some(existing) => {
                    return Err(Error::ConflictingContext {
                        field: "priority",
                        context: priority.to_string(),
                        query: existing.to_string(),
                    });
                }
            }
        }

        Ok(merged)
    }

    /// True when the query carries no predicate or mutation content at all.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
            && self.tags.is_empty()
            && self.anti_tags.is_empty()
            && self.project.is_none()
            && self.anti_projects.is_empty()
            && self.due.is_none()
            && self.priority.is_none()
            && self.template.is_none()
            && self.text.is_empty()
            && self.note.is_empty()
    }

    /// Render the query back into token form, used to echo the context.
    pub fn display_tokens(&self) -> String {
        let mut tokens = Vec::new();
        for tag in &self.tags {
            tokens.push(format!("+{tag}"));
        }
        for tag in &self.anti_tags {
            tokens.push(format!("-{tag}"));
        }
        if let Some(project) = &self.project {
            tokens.push(format!("project:{project}"));
        }
        for project in &self.anti_projects {
            tokens.push(format!("-project:{project}"));
        }
        if let Some(due) = &self.due {
            tokens.push(due.to_string());
        }
        if let Some(priority) = self.priority {
            tokens.push(priority.label().to_lowercase());
        }
        if !self.text.is_empty() {
            tokens.push(self.text.clone());
        }
        tokens.join(" ")
    }
}

/// Parse a `due:` / `due.<mode>:` token, or return `None` when the token is
/// not a due filter at all.
fn parse_due_token(lower: &str) -> Result<Option<DueFilter>> {
    if lower == "due.overdue" || lower == "due:overdue" {
        return Ok(Some(DueFilter::Overdue));
    }
    if let Some(date) = lower.strip_prefix("due.before:") {
        return Ok(Some(DueFilter::Before(parse_date(date)?)));
    }
    if let Some(date) = lower.strip_prefix("due.after:") {
        return Ok(Some(DueFilter::After(parse_date(date)?)));
    }
    if let Some(date) = lower.strip_prefix("due:") {
        return Ok(Some(DueFilter::On(parse_date(date)?)));
    }
    Ok(None)
}

/// Accepts `YYYY-MM-DD`, `today`, and `tomorrow`; resolves to midnight UTC.
fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let date = match value {
        "today" => Utc::now().date_naive(),
        "tomorrow" => Utc::now().date_naive() + Duration::days(1),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            Error::InvalidArgument(format!("unparseable due date: {other}"))
        })?,
    };
    let midnight = date.and_time(NaiveTime::MIN);
    Ok(Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: &[&str]) -> Query {
        Query::parse(tokens).expect("parse")
    }

    #[test]
    fn leading_integers_become_handles() {
        let query = parse(&["16", "modify", "+project:p", "-project:x", "-fun"]);
        assert_eq!(query.handles, vec![16]);
        assert_eq!(query.cmd, Some(CmdKind::Modify));
        assert_eq!(query.project.as_deref(), Some("p"));
        assert_eq!(query.anti_projects, vec!["x".to_string()]);
        assert_eq!(query.anti_tags, vec!["fun".to_string()]);
    }

    #[test]
    fn handle_parsing_closes_after_first_plain_token() {
        let query = parse(&["3", "add", "buy", "2", "apples"]);
        assert_eq!(query.handles, vec![3]);
        assert_eq!(query.cmd, Some(CmdKind::Add));
        assert_eq!(query.text, "buy 2 apples");
    }

    #[test]
    fn separator_sets_ignore_context() {
        let query = parse(&["--", "show-resolved"]);
        assert!(query.ignore_context);
        assert_eq!(query.cmd, Some(CmdKind::ShowResolved));
    }

    #[test]
    fn slash_switches_to_note_accumulation() {
        let query = parse(&["5", "note", "/", "+not-a-tag", "project:kept", "As", "Is"]);
        assert_eq!(query.handles, vec![5]);
        assert_eq!(query.cmd, Some(CmdKind::Note));
        assert_eq!(query.note, "+not-a-tag project:kept As Is");
        assert!(query.tags.is_empty());
        assert!(query.project.is_none());
    }

    #[test]
    fn command_names_match_case_insensitively() {
        let query = parse(&["Show-Resolved"]);
        assert_eq!(query.cmd, Some(CmdKind::ShowResolved));
        let query = parse(&["RM", "4"]);
        assert_eq!(query.cmd, Some(CmdKind::Remove));
        assert_eq!(query.handles, vec![4]);
    }

    #[test]
    fn second_command_token_is_free_text() {
        let query = parse(&["add", "start", "the", "engine"]);
        assert_eq!(query.cmd, Some(CmdKind::Add));
        assert_eq!(query.text, "start the engine");
    }

    #[test]
    fn first_project_wins() {
        let query = parse(&["project:one", "project:two"]);
        assert_eq!(query.project.as_deref(), Some("one"));
    }

    #[test]
    fn duplicate_due_token_is_fatal() {
        let err = Query::parse(&["due:2026-01-01", "due:2026-01-02"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateDueFilter(_)));
    }

    #[test]
    fn due_modes_parse() {
        let query = parse(&["due.before:2026-03-01"]);
        assert!(matches!(query.due, Some(DueFilter::Before(_))));
        let query = parse(&["due.overdue"]);
        assert_eq!(query.due, Some(DueFilter::Overdue));
        let query = parse(&["due:today"]);
        assert!(matches!(query.due, Some(DueFilter::On(_))));
    }

    #[test]
    fn template_reference_requires_integer() {
        let query = parse(&["add", "template:3"]);
        assert_eq!(query.template, Some(3));
        let query = parse(&["add", "template:weekly"]);
        assert_eq!(query.template, None);
        assert_eq!(query.text, "template:weekly");
    }

    #[test]
    fn bare_priority_literal_sets_priority_once() {
        let query = parse(&["add", "p1", "fix", "p3"]);
        assert_eq!(query.priority, Some(Priority::High));
        assert_eq!(query.text, "fix");
    }

    #[test]
    fn free_text_preserves_case_and_order() {
        let query = parse(&["add", "Fix", "THE", "Reactor"]);
        assert_eq!(query.text, "Fix THE Reactor");
    }

    #[test]
    fn single_char_dash_token_is_text_not_tag() {
        let query = parse(&["add", "a", "-", "b"]);
        assert!(query.anti_tags.is_empty());
        assert_eq!(query.text, "a - b");
    }

    #[test]
    fn merge_unions_tags() {
        let base = parse(&["+cli"]);
        let context = parse(&["+bug", "+cli", "-slow"]);
        let merged = base.merge_context(&context).expect("merge");
        assert_eq!(merged.tags, vec!["cli".to_string(), "bug".to_string()]);
        assert_eq!(merged.anti_tags, vec!["slow".to_string()]);
    }

    #[test]
    fn merge_project_conflict_is_fatal() {
        let base = parse(&["project:home"]);
        let context = parse(&["project:work"]);
        let err = base.merge_context(&context).unwrap_err();
        assert!(matches!(
            err,
            Error::ConflictingContext { field: "project", .. }
        ));
    }

    #[test]
    fn merge_fills_unset_project() {
        let base = parse(&["+bug"]);
        let context = parse(&["project:work"]);
        let merged = base.merge_context(&context).expect("merge");
        assert_eq!(merged.project.as_deref(), Some("work"));
    }

    #[test]
    fn merge_accepts_identical_due() {
        let base = parse(&["due:2026-06-01"]);
        let context = parse(&["due:2026-06-01"]);
        let merged = base.merge_context(&context).expect("merge");
        assert!(matches!(merged.due, Some(DueFilter::On(_))));

        let other = parse(&["due:2026-06-02"]);
        assert!(base.merge_context(&other).is_err());
    }

    #[test]
    fn merge_priority_conflict_is_fatal() {
        let base = parse(&["p1"]);
        let context = parse(&["p2"]);
        assert!(matches!(
            base.merge_context(&context),
            Err(Error::ConflictingContext { field: "priority", .. })
        ));
        let same = parse(&["p1"]);
        base.merge_context(&same).expect("identical priority merges");
    }

    #[test]
    fn display_tokens_round_trips_through_parse() {
        let query = parse(&["+bug", "project:work", "due:2026-06-01", "p1"]);
        let echoed = query.display_tokens();
        let tokens: Vec<&str> = echoed.split_whitespace().collect();
        let reparsed = parse(&tokens);
        assert_eq!(reparsed.tags, query.tags);
        assert_eq!(reparsed.project, query.project);
        assert_eq!(reparsed.due, query.due);
        assert_eq!(reparsed.priority, query.priority);
    }
}
