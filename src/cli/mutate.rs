//! Mutating commands: add, template, start/stop/done, modify, note, remove,
//! and the persisted context.
//!
//! Every handler follows the same shape: load the relevant statuses, mutate
//! through the TaskSet's guarded update path, save pending records, and
//! request one revision commit describing the change.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, OutputOptions, TaskView};
use crate::query::{DueFilter, Query};
use crate::state::State;
use crate::status::Status;
use crate::task::Task;
use crate::taskset::TaskSet;

use super::{
    addressable_statuses, effective_query, open_store, require_handles, save_and_commit,
};

/// Create a new pending task from the query's free text and attributes,
/// optionally instantiated from a template.
pub fn add(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;
    let mut tasks = TaskSet::load(&store, &addressable_statuses())?;

    let mut task = match merged.template {
        Some(reference) => {
            let template = tasks.get_by_handle(reference)?;
            if template.status != Status::Template {
                return Err(Error::InvalidArgument(format!(
                    "task {reference} is not a template"
                )));
            }
            let mut task = Task::new(Status::Pending, template.summary.clone());
            task.notes = template.notes.clone();
            task.tags = template.tags.clone();
            task.project = template.project.clone();
            task.priority = template.priority;
            task.due = template.due;
            task
        }
        None => Task::new(Status::Pending, ""),
    };

    apply_attributes(&mut task, &merged);
    if task.summary.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "add requires a summary: tsk add <summary> [+tag] [project:name]".to_string(),
        ));
    }

    let added = tasks.add(task)?;
    save_and_commit(&repo, &store, &mut tasks, &format!("Added: {}", added.summary))?;
    emit_success(
        options,
        "add",
        &TaskView::from(&added),
        &[added.display_line()],
    )
}

/// With free text, create a template task; with handles, convert pending
/// tasks into templates.
pub fn template(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;
    let mut tasks = TaskSet::load(&store, &addressable_statuses())?;

    if merged.handles.is_empty() {
        let mut task = Task::new(Status::Template, "");
        apply_attributes(&mut task, &merged);
        if task.summary.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "template requires a summary or task handles".to_string(),
            ));
        }
        let added = tasks.add(task)?;
        save_and_commit(
            &repo,
            &store,
            &mut tasks,
            &format!("Templated: {}", added.summary),
        )?;
        return emit_success(
            options,
            "template",
            &TaskView::from(&added),
            &[added.display_line()],
        );
    }

    let mut views = Vec::new();
    let mut lines = Vec::new();
    let mut summaries = Vec::new();
    for &handle in &merged.handles {
        let mut task = tasks.get_by_handle(handle)?;
        task.status = Status::Template;
        tasks.update(task)?;
        let updated = tasks.get_by_handle(handle)?;
        summaries.push(updated.summary.clone());
        lines.push(updated.display_line());
        views.push(TaskView::from(&updated));
    }
    save_and_commit(
        &repo,
        &store,
        &mut tasks,
        &format!("Templated: {}", summaries.join(", ")),
    )?;
    emit_success(options, "template", &views, &lines)
}

/// Transition addressed tasks to a new status (start, stop, done).
pub fn transition(
    config: &Config,
    options: OutputOptions,
    query: &Query,
    to: Status,
    verb: &str,
) -> Result<()> {
    require_handles(query, verb)?;
    let (repo, store) = open_store(config)?;
    let mut tasks = TaskSet::load(&store, &addressable_statuses())?;

    let mut views = Vec::new();
    let mut lines = Vec::new();
    let mut summaries = Vec::new();
    for &handle in &query.handles {
        let mut task = tasks.get_by_handle(handle)?;
        let uuid = task.uuid;
        task.status = to;
        tasks.update(task)?;
        let updated = tasks.get_by_identity(&uuid.to_string())?;
        summaries.push(updated.summary.clone());
        lines.push(updated.display_line());
        views.push(TaskView::from(&updated));
    }

    save_and_commit(
        &repo,
        &store,
        &mut tasks,
        &format!("{verb}: {}", summaries.join(", ")),
    )?;
    emit_success(options, &verb.to_lowercase(), &views, &lines)
}

/// Apply the query's attribute operators to addressed tasks.
pub fn modify(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    require_handles(query, "modify")?;
    let (repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;
    let mut tasks = TaskSet::load(&store, &addressable_statuses())?;

    let mut views = Vec::new();
    let mut lines = Vec::new();
    let mut summaries = Vec::new();
    for &handle in &merged.handles {
        let mut task = tasks.get_by_handle(handle)?;
        task.modify(&merged);
        tasks.update(task)?;
        let updated = tasks.get_by_handle(handle)?;
        summaries.push(updated.summary.clone());
        lines.push(updated.display_line());
        views.push(TaskView::from(&updated));
    }

    save_and_commit(
        &repo,
        &store,
        &mut tasks,
        &format!("Modified: {}", summaries.join(", ")),
    )?;
    emit_success(options, "modify", &views, &lines)
}

/// Append note text to addressed tasks. The note body comes from a `/`
/// section when present, otherwise from the free text.
pub fn note(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    require_handles(query, "note")?;
    let content = if query.note.is_empty() {
        query.text.clone()
    } else {
        query.note.clone()
    };
    if content.is_empty() {
        return Err(Error::InvalidArgument(
            "note requires text: tsk <handle> note / <text>".to_string(),
        ));
    }

    let (repo, store) = open_store(config)?;
    let mut tasks = TaskSet::load(&store, &addressable_statuses())?;

    let mut append = Query::default();
    append.note = content;

    let mut views = Vec::new();
    let mut lines = Vec::new();
    let mut summaries = Vec::new();
    for &handle in &query.handles {
        let mut task = tasks.get_by_handle(handle)?;
        task.modify(&append);
        tasks.update(task)?;
        let updated = tasks.get_by_handle(handle)?;
        summaries.push(updated.summary.clone());
        lines.push(updated.display_line());
        views.push(TaskView::from(&updated));
    }

    save_and_commit(
        &repo,
        &store,
        &mut tasks,
        &format!("Annotated: {}", summaries.join(", ")),
    )?;
    emit_success(options, "note", &views, &lines)
}

/// Soft-delete addressed tasks; the next save removes their records.
pub fn remove(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    require_handles(query, "remove")?;
    let (repo, store) = open_store(config)?;
    let mut tasks = TaskSet::load(&store, &addressable_statuses())?;

    let mut summaries = Vec::new();
    for &handle in &query.handles {
        let task = tasks.get_by_handle(handle)?;
        summaries.push(task.summary.clone());
        tasks.remove(&task.uuid)?;
    }

    save_and_commit(
        &repo,
        &store,
        &mut tasks,
        &format!("Removed: {}", summaries.join(", ")),
    )?;
    emit_success(options, "remove", &summaries, &summaries)
}

/// Show, set, or clear the persisted context.
pub fn context(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    // Bootstrap so the state directory under .git exists.
    let (_repo, _store) = open_store(config)?;

    if query.is_empty() {
        let state = State::load(&config.state_file);
        let line = if state.context.is_empty() {
            "no context".to_string()
        } else {
            state.context.display_tokens()
        };
        return emit_success(options, "context", &state.context, &[line]);
    }

    if query.text == "none" {
        State::default().save(&config.state_file)?;
        return emit_success(
            options,
            "context",
            &Query::default(),
            &["context cleared".to_string()],
        );
    }

    if !query.handles.is_empty() {
        return Err(Error::InvalidArgument(
            "context cannot contain task handles".to_string(),
        ));
    }

    let mut context = query.clone();
    context.cmd = None;
    context.ignore_context = false;

    let mut state = State::load(&config.state_file);
    state.context = context.clone();
    state.save(&config.state_file)?;
    emit_success(options, "context", &context, &[context.display_tokens()])
}

/// Copy query attributes onto a task being created.
fn apply_attributes(task: &mut Task, query: &Query) {
    if !query.text.is_empty() {
        task.summary = query.text.clone();
    }
    for tag in &query.tags {
        if !task.tags.contains(tag) {
            task.tags.push(tag.clone());
        }
    }
    if let Some(project) = &query.project {
        task.project = Some(project.clone());
    }
    if let Some(priority) = query.priority {
        task.priority = priority;
    }
    if let Some(DueFilter::On(date)) = query.due {
        task.due = Some(date);
    }
    if !query.note.is_empty() {
        if task.notes.is_empty() {
            task.notes = query.note.clone();
        } else {
            task.notes = format!("{}\n{}", task.notes, query.note);
        }
    }
}
