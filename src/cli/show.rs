//! Listing commands: next and the show-* family.

use std::collections::BTreeSet;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, task_lines, OutputOptions, TaskView};
use crate::project;
use crate::query::Query;
use crate::status::{Status, ALL_STATUSES, OPEN_STATUSES};
use crate::taskset::TaskSet;

use super::{effective_query, open_store};

/// Default listing: open tasks matching the context-merged query, sorted
/// for triage.
pub fn next(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (_repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;

    let mut tasks = TaskSet::load(&store, &OPEN_STATUSES)?;
    tasks.filter(&merged);
    tasks.sort_by_priority();

    emit_listing(options, "next", &tasks)
}

/// List open tasks currently in one specific status.
pub fn show_status(
    config: &Config,
    options: OutputOptions,
    query: &Query,
    status: Status,
) -> Result<()> {
    let (_repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;

    let mut tasks = TaskSet::load(&store, &OPEN_STATUSES)?;
    tasks.filter(&merged);
    tasks.filter_status(status);
    tasks.sort_by_priority();

    let command = format!("show-{}", status.dir_name());
    emit_listing(options, &command, &tasks)
}

/// List resolved tasks, oldest resolution first.
pub fn show_resolved(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (_repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;

    let mut tasks = TaskSet::load(&store, &[Status::Resolved])?;
    tasks.filter(&merged);
    tasks.sort_by_resolved();

    emit_listing(options, "show-resolved", &tasks)
}

/// List template tasks.
pub fn show_templates(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (_repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;

    let mut tasks = TaskSet::load(&store, &[Status::Template])?;
    tasks.filter(&merged);
    tasks.sort_by_priority();

    emit_listing(options, "show-templates", &tasks)
}

/// Aggregate view over every project, open and resolved tasks included.
pub fn show_projects(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (_repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;

    let mut tasks = TaskSet::load(&store, &ALL_STATUSES)?;
    tasks.filter(&merged);

    let summaries = project::summarize(&tasks);
    let lines: Vec<String> = summaries
        .iter()
        .map(|summary| {
            format!(
                "{:<20} {:>4} open {:>4} resolved{}",
                summary.name,
                summary.open,
                summary.resolved,
                if summary.active { "  active" } else { "" },
            )
        })
        .collect();
    emit_success(options, "show-projects", &summaries, &lines)
}

/// Distinct tags across the filtered open tasks.
pub fn show_tags(config: &Config, options: OutputOptions, query: &Query) -> Result<()> {
    let (_repo, store) = open_store(config)?;
    let merged = effective_query(config, query)?;

    let mut tasks = TaskSet::load(&store, &OPEN_STATUSES)?;
    tasks.filter(&merged);

    let tags: BTreeSet<String> = tasks
        .view_tasks()
        .flat_map(|task| task.tags.iter().cloned())
        .collect();
    let lines: Vec<String> = tags.iter().cloned().collect();
    emit_success(options, "show-tags", &tags, &lines)
}

fn emit_listing(options: OutputOptions, command: &str, tasks: &TaskSet) -> Result<()> {
    let views: Vec<TaskView> = tasks.view_tasks().map(TaskView::from).collect();
    let lines = task_lines(tasks.view_tasks());
    emit_success(options, command, &views, &lines)
}
