//! tsk - git-backed task tracker library
//!
//! The durable store is one file per task inside a git-controlled
//! directory; every invocation reconstructs a consistent integer-handle to
//! permanent-identity mapping from disk, with no daemon and no database.
//!
//! # Core Concepts
//!
//! - **Tasks**: records with a permanent UUID identity and a transient
//!   per-process integer handle
//! - **Status buckets**: one directory per lifecycle status, enforced by a
//!   fixed transition table
//! - **Queries**: flat tag/project/priority/date/text predicates parsed
//!   from command-line tokens
//! - **Context**: a persisted query merged into most commands, with
//!   conflict detection instead of silent overrides
//! - **Persistence**: saves touch only changed records, followed by one
//!   revision commit; history is the recovery mechanism
//!
//! # Module Organization
//!
//! - `cli`: command-line interface using clap
//! - `config`: explicit configuration (repo path, state file)
//! - `error`: error types and result alias
//! - `git`: revision-control collaborator wrapping libgit2
//! - `output`: human and JSON output helpers
//! - `project`: derived per-project aggregates
//! - `query`: query parsing and context merge
//! - `state`: persisted context state
//! - `status`: lifecycle state machine
//! - `store`: per-status record directories
//! - `task`: the task entity
//! - `taskset`: in-memory index and handle allocator

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod output;
pub mod project;
pub mod query;
pub mod state;
pub mod status;
pub mod store;
pub mod task;
pub mod taskset;

pub use error::{Error, Result};
