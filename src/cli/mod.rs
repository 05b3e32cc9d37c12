//! Command-line interface for tsk.
//!
//! The surface is deliberately thin: clap handles the global flags, and
//! every remaining token flows into `Query::parse`. The parsed command kind
//! dispatches through one exhaustive match: there is no string-keyed
//! command table and no runtime default case.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::Repo;
use crate::output::OutputOptions;
use crate::query::{CmdKind, Query};
use crate::state::State;
use crate::status::{Status, OPEN_STATUSES};
use crate::store::Store;
use crate::taskset::TaskSet;

mod mutate;
mod show;
mod sync;

/// tsk - git-backed task tracker
///
/// Tasks are stored one file per task in a git-controlled directory. Most
/// arguments form a query: leading integers address tasks by handle, a
/// command name picks the action, and the rest are filters or attributes
/// (+tag, -tag, project:name, due:date, a priority, free text).
#[derive(Parser, Debug)]
#[command(name = "tsk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the task repository (defaults to ~/.tsk)
    #[arg(long, env = "TSK_REPO")]
    pub repo: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Query tokens: handles, command, filters, attributes, free text
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}

impl Cli {
    /// Parse the query and dispatch the command.
    pub fn run(self) -> Result<()> {
        let options = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let config = Config::resolve(self.repo)?;

        // The git escape hatch forwards its arguments verbatim; query
        // parsing would mangle them.
        if self.tokens.first().map(String::as_str) == Some("git") {
            return sync::git_passthrough(&config, &self.tokens[1..]);
        }

        let mut query = Query::parse(&self.tokens)?;
        // clap consumes the first bare `--` separator before the tokens
        // reach the parser, so recover it from the raw argv. Only a `--`
        // ahead of the kept tokens is the context escape; one buried in
        // note or free text is not.
        if !query.ignore_context && separator_precedes_tokens(&self.tokens) {
            query.ignore_context = true;
        }

        match query.cmd.unwrap_or(CmdKind::Next) {
            CmdKind::Next | CmdKind::ShowOpen => show::next(&config, options, &query),
            CmdKind::Add => mutate::add(&config, options, &query),
            CmdKind::Template => mutate::template(&config, options, &query),
            CmdKind::Remove => mutate::remove(&config, options, &query),
            CmdKind::Start => {
                mutate::transition(&config, options, &query, Status::Active, "Started")
            }
            CmdKind::Stop => {
                mutate::transition(&config, options, &query, Status::Paused, "Stopped")
            }
            CmdKind::Done => {
                mutate::transition(&config, options, &query, Status::Resolved, "Resolved")
            }
            CmdKind::Modify => mutate::modify(&config, options, &query),
            CmdKind::Note => mutate::note(&config, options, &query),
            CmdKind::Context => mutate::context(&config, options, &query),
            CmdKind::ShowActive => show::show_status(&config, options, &query, Status::Active),
            CmdKind::ShowPaused => show::show_status(&config, options, &query, Status::Paused),
            CmdKind::ShowResolved => show::show_resolved(&config, options, &query),
            CmdKind::ShowTemplates => show::show_templates(&config, options, &query),
            CmdKind::ShowProjects => show::show_projects(&config, options, &query),
            CmdKind::ShowTags => show::show_tags(&config, options, &query),
            CmdKind::Sync => sync::sync(&config, options),
            CmdKind::Undo => sync::undo(&config, options),
            CmdKind::Git => sync::git_passthrough(&config, &[]),
            CmdKind::Version => {
                println!("tsk {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Whether the raw argv carries a `--` ahead of the first kept query token.
/// clap strips the separator itself, so the parsed tokens alone cannot tell
/// where it stood.
fn separator_precedes_tokens(tokens: &[String]) -> bool {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(separator) = args.iter().position(|arg| arg == "--") else {
        return false;
    };
    match tokens.first() {
        Some(first) => match args.iter().position(|arg| arg == first) {
            Some(token_pos) => separator < token_pos,
            None => false,
        },
        // No tokens at all: a bare `tsk --` still opts out.
        None => true,
    }
}

/// Merge the persisted context into a command-line query, unless the query
/// opted out with `--`.
fn effective_query(config: &Config, query: &Query) -> Result<Query> {
    if query.ignore_context {
        return Ok(query.clone());
    }
    let state = State::load(&config.state_file);
    query.merge_context(&state.context)
}

/// Statuses loaded whenever tasks are addressed by handle: everything that
/// carries one, templates included.
fn addressable_statuses() -> Vec<Status> {
    let mut statuses: Vec<Status> = OPEN_STATUSES.to_vec();
    statuses.push(Status::Template);
    statuses
}

/// Open the repository and store together, bootstrapping the repository on
/// first use.
fn open_store(config: &Config) -> Result<(Repo, Store)> {
    let repo = Repo::open_or_init(&config.repo)?;
    let store = Store::new(config);
    store.ensure_layout()?;
    Ok((repo, store))
}

/// Save every pending record and request one revision commit covering them.
/// No pending records means no commit at all.
fn save_and_commit(
    repo: &Repo,
    store: &Store,
    tasks: &mut TaskSet,
    message: &str,
) -> Result<()> {
    let touched = store.save_pending(tasks)?;
    if touched.is_empty() {
        return Ok(());
    }
    repo.commit_all(message)?;
    Ok(())
}

/// Addressed-task commands require explicit handles.
fn require_handles(query: &Query, verb: &str) -> Result<()> {
    if query.handles.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{verb} requires one or more task handles"
        )));
    }
    Ok(())
}
