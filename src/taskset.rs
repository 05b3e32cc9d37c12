//! In-memory task index for one invocation.
//!
//! A `TaskSet` owns every loaded task plus two lookup indices (permanent
//! identity and integer handle) and an enumerable view. `update` is the sole
//! mutation path: callers pass owned `Task` values and never retain a
//! reference across it, so the indexed copy is always the single current
//! one.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::query::Query;
use crate::status::Status;
use crate::store::Store;
use crate::task::Task;

/// Largest integer handle ever assigned. Allocation scans from 1 upward and
/// fails once the space is exhausted.
pub const MAX_HANDLE: u32 = 10_000;

/// The full collection of loaded tasks, with lookup indices and a filtered
/// view.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
    by_identity: HashMap<Uuid, usize>,
    by_handle: HashMap<u32, usize>,
    /// Enumerable projection over `tasks`; filtering and sorting touch only
    /// this, never the indices.
    view: Vec<usize>,
}

impl TaskSet {
    /// Load all tasks with one of the requested statuses from the store,
    /// normalising, validating, and indexing each. Handles persisted by a
    /// previous session are kept when still unique; duplicates are stripped
    /// from the later-loaded record and re-allocated.
    pub fn load(store: &Store, statuses: &[Status]) -> Result<TaskSet> {
        let mut set = TaskSet::default();
        for task in store.load(statuses)? {
            set.insert(task)?;
        }
        Ok(set)
    }

    /// Add a brand-new task, allocating its handle and marking it for the
    /// next save.
    pub fn add(&mut self, mut task: Task) -> Result<Task> {
        task.write_pending = true;
        self.insert(task.clone())?;
        // Report the task as indexed, handle included.
        self.get_by_identity(&task.uuid.to_string())
    }

    fn insert(&mut self, mut task: Task) -> Result<()> {
        task.normalise();
        task.validate()?;

        if self.by_identity.contains_key(&task.uuid) {
            return Err(Error::InvalidTask(format!(
                "duplicate identity in store: {}",
                task.uuid
            )));
        }

        if task.status.carries_handle() {
            let keep = matches!(
                task.handle,
                Some(handle)
                    if (1..=MAX_HANDLE).contains(&handle)
                        && !self.by_handle.contains_key(&handle)
            );
            if !keep {
                let handle = self.next_handle()?;
                if task.handle != Some(handle) {
                    task.write_pending = true;
                }
                task.handle = Some(handle);
            }
        } else if task.handle.take().is_some() {
            task.write_pending = true;
        }

        let index = self.tasks.len();
        if let Some(handle) = task.handle {
            self.by_handle.insert(handle, index);
        }
        self.by_identity.insert(task.uuid, index);
        self.view.push(index);
        self.tasks.push(task);
        Ok(())
    }

    /// Smallest positive integer not currently assigned.
    fn next_handle(&self) -> Result<u32> {
        (1..=MAX_HANDLE)
            .find(|handle| !self.by_handle.contains_key(handle))
            .ok_or(Error::HandleSpaceExhausted(MAX_HANDLE))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Exact lookup by integer handle.
    pub fn get_by_handle(&self, handle: u32) -> Result<Task> {
        self.by_handle
            .get(&handle)
            .map(|&index| self.tasks[index].clone())
            .ok_or_else(|| Error::NotFound(handle.to_string()))
    }

    /// Unique-prefix lookup by identity string.
    pub fn get_by_identity(&self, prefix: &str) -> Result<Task> {
        let needle = prefix.to_lowercase();
        let mut found = None;
        for (uuid, &index) in &self.by_identity {
            if uuid.to_string().starts_with(&needle) {
                if found.is_some() {
                    return Err(Error::AmbiguousIdentity(prefix.to_string()));
                }
                found = Some(index);
            }
        }
        found
            .map(|index| self.tasks[index].clone())
            .ok_or_else(|| Error::NotFound(prefix.to_string()))
    }

    // =========================================================================
    // View: filtering and sorting
    // =========================================================================

    /// Restrict the enumerable view to tasks matching the query. Indices are
    /// unaffected; handle and identity lookups still see every loaded task.
    pub fn filter(&mut self, query: &Query) {
        let tasks = &self.tasks;
        self.view.retain(|&index| tasks[index].matches(query));
    }

    /// Restrict the view to tasks in the given status.
    pub fn filter_status(&mut self, status: Status) {
        let tasks = &self.tasks;
        self.view.retain(|&index| tasks[index].status == status);
    }

    /// Stable listing sort: status order first (active work on top,
    /// resolved last), then priority rank critical-first, then creation
    /// time. Equal-priority tasks retain creation order.
    pub fn sort_by_priority(&mut self) {
        let tasks = &self.tasks;
        self.view.sort_by(|&a, &b| {
            let left = &tasks[a];
            let right = &tasks[b];
            left.status
                .sort_rank()
                .cmp(&right.status.sort_rank())
                .then_with(|| left.priority.cmp(&right.priority))
                .then_with(|| left.created.cmp(&right.created))
        });
    }

    /// Stable ascending sort by resolution time.
    pub fn sort_by_resolved(&mut self) {
        let tasks = &self.tasks;
        self.view.sort_by(|&a, &b| {
            let left = &tasks[a];
            let right = &tasks[b];
            left.resolved.cmp(&right.resolved)
        });
    }

    /// Tasks currently in the view, in view order.
    pub fn view_tasks(&self) -> impl Iterator<Item = &Task> {
        self.view.iter().map(|&index| &self.tasks[index])
    }

    /// Every loaded task, regardless of the view, soft-deleted ones
    /// excluded.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.deleted)
    }

    /// Mutable access for the persistence layer only: it clears
    /// `write_pending` and updates `loaded_status` after writing, which
    /// never perturbs the indices.
    pub(crate) fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// The sole mutation path. Re-validates, enforces the status transition
    /// table, re-derives handle assignment, stamps `modified`, marks the
    /// task dirty, and swaps the indexed copy.
    ///
    /// Any error leaves the set exactly as it was.
    pub fn update(&mut self, mut task: Task) -> Result<()> {
        let index = *self
            .by_identity
            .get(&task.uuid)
            .ok_or_else(|| Error::NotFound(task.uuid.to_string()))?;

        task.normalise();
        task.validate()?;

        let previous = &self.tasks[index];
        previous.status.check_transition(task.status)?;

        if task.status == Status::Resolved {
            if previous.status != Status::Resolved && task.resolved.is_none() {
                task.resolved = Some(Utc::now());
            }
        }

        // Handle re-derivation: the previous assignment is authoritative,
        // not whatever the caller's copy carries.
        let previous_handle = previous.handle;
        if task.status.carries_handle() {
            task.handle = match previous_handle {
                Some(handle) => Some(handle),
                None => {
                    let handle = self.next_handle()?;
                    self.by_handle.insert(handle, index);
                    Some(handle)
                }
            };
        } else {
            if let Some(handle) = previous_handle {
                self.by_handle.remove(&handle);
            }
            task.handle = None;
        }

        task.modified = Some(Utc::now());
        task.write_pending = true;
        self.tasks[index] = task;
        Ok(())
    }

    /// Soft-delete a task: release its handle, drop it from the view, and
    /// mark it so the next save removes its record. Deletion is not a status
    /// transition and bypasses the transition table.
    pub fn remove(&mut self, uuid: &Uuid) -> Result<()> {
        let index = *self
            .by_identity
            .get(uuid)
            .ok_or_else(|| Error::NotFound(uuid.to_string()))?;

        if let Some(handle) = self.tasks[index].handle.take() {
            self.by_handle.remove(&handle);
        }
        self.tasks[index].deleted = true;
        self.tasks[index].write_pending = true;
        self.view.retain(|&entry| entry != index);
        Ok(())
    }

    /// Number of tasks in the view.
    pub fn len(&self) -> usize {
        self.view.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::Duration;

    fn open_task(summary: &str) -> Task {
        Task::new(Status::Pending, summary)
    }

    fn set_with(tasks: Vec<Task>) -> TaskSet {
        let mut set = TaskSet::default();
        for task in tasks {
            set.insert(task).expect("insert");
        }
        set
    }

    #[test]
    fn handles_are_pairwise_distinct() {
        let set = set_with(vec![open_task("a"), open_task("b"), open_task("c")]);
        let mut handles: Vec<u32> = set.all_tasks().filter_map(|t| t.handle).collect();
        handles.sort_unstable();
        assert_eq!(handles, vec![1, 2, 3]);
    }

    #[test]
    fn persisted_handle_kept_when_unique() {
        let mut task = open_task("kept");
        task.handle = Some(42);
        let set = set_with(vec![task]);
        assert_eq!(set.get_by_handle(42).expect("lookup").summary, "kept");
    }

    #[test]
    fn duplicate_persisted_handle_stripped_from_later_task() {
        let mut first = open_task("first");
        first.handle = Some(7);
        let mut second = open_task("second");
        second.handle = Some(7);

        let set = set_with(vec![first, second]);
        assert_eq!(set.get_by_handle(7).expect("lookup").summary, "first");
        let reassigned = set
            .all_tasks()
            .find(|t| t.summary == "second")
            .and_then(|t| t.handle)
            .expect("reassigned handle");
        assert_eq!(reassigned, 1);
    }

    #[test]
    fn resolved_tasks_carry_no_handle() {
        let mut task = Task::new(Status::Resolved, "done already");
        task.handle = Some(3);
        let set = set_with(vec![task]);
        assert!(set.get_by_handle(3).is_err());
        assert_eq!(set.all_tasks().next().expect("task").handle, None);
    }

    #[test]
    fn handle_released_on_resolve_and_reusable() {
        let mut set = set_with(vec![open_task("a"), open_task("b")]);

        let mut first = set.get_by_handle(1).expect("task 1");
        first.status = Status::Resolved;
        set.update(first).expect("resolve");

        // Former handle is free again for a newly added task.
        let added = set.add(open_task("c")).expect("add");
        assert_eq!(added.handle, Some(1));
    }

    #[test]
    fn update_enforces_transition_table_without_state_change() {
        let mut resolved = Task::new(Status::Resolved, "finished");
        resolved.resolved = Some(Utc::now());
        // Simulate a task loaded from disk rather than freshly created.
        resolved.write_pending = false;
        let mut set = set_with(vec![resolved]);

        let mut copy = set.all_tasks().next().expect("task").clone();
        copy.status = Status::Active;
        let err = set.update(copy).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let unchanged = set.all_tasks().next().expect("task");
        assert_eq!(unchanged.status, Status::Resolved);
        assert!(!unchanged.write_pending);
    }

    #[test]
    fn update_stamps_resolved_and_clears_handle() {
        let mut set = set_with(vec![open_task("a")]);
        let mut task = set.get_by_handle(1).expect("task");
        task.status = Status::Resolved;
        set.update(task).expect("resolve");

        let task = set.all_tasks().next().expect("task");
        assert_eq!(task.status, Status::Resolved);
        assert!(task.resolved.is_some());
        assert_eq!(task.handle, None);
        assert!(task.write_pending);
        assert!(set.get_by_handle(1).is_err());
    }

    #[test]
    fn filter_restricts_view_but_not_indices() {
        let mut tagged = open_task("tagged");
        tagged.tags = vec!["bug".to_string()];
        let mut set = set_with(vec![tagged, open_task("plain")]);

        let mut query = Query::default();
        query.tags = vec!["bug".to_string()];
        set.filter(&query);

        assert_eq!(set.len(), 1);
        assert_eq!(set.view_tasks().next().expect("view").summary, "tagged");
        // Lookup still sees the filtered-out task.
        assert_eq!(set.get_by_handle(2).expect("lookup").summary, "plain");
    }

    #[test]
    fn sort_by_priority_orders_status_then_priority_then_created() {
        let base = Utc::now();
        let mut low = open_task("low");
        low.priority = Priority::Low;
        low.created = base;
        let mut critical_late = open_task("critical-late");
        critical_late.priority = Priority::Critical;
        critical_late.created = base + Duration::seconds(2);
        let mut critical_early = open_task("critical-early");
        critical_early.priority = Priority::Critical;
        critical_early.created = base + Duration::seconds(1);
        let mut active = Task::new(Status::Active, "active");
        active.priority = Priority::Low;
        active.created = base + Duration::seconds(3);

        let mut set = set_with(vec![low, critical_late, critical_early, active]);
        set.sort_by_priority();

        let order: Vec<&str> = set.view_tasks().map(|t| t.summary.as_str()).collect();
        assert_eq!(order, vec!["active", "critical-early", "critical-late", "low"]);
    }

    #[test]
    fn identity_prefix_lookup() {
        let set = set_with(vec![open_task("a"), open_task("b")]);
        let uuid = set.get_by_handle(1).expect("task").uuid;
        let prefix = &uuid.to_string()[..8];

        let found = set.get_by_identity(prefix).expect("prefix lookup");
        assert_eq!(found.uuid, uuid);

        assert!(matches!(
            set.get_by_identity("zzzzzzzz"),
            Err(Error::NotFound(_))
        ));
        // The empty prefix matches everything.
        assert!(matches!(
            set.get_by_identity(""),
            Err(Error::AmbiguousIdentity(_))
        ));
    }

    #[test]
    fn remove_releases_handle_and_hides_task() {
        let mut set = set_with(vec![open_task("doomed")]);
        let uuid = set.get_by_handle(1).expect("task").uuid;
        set.remove(&uuid).expect("remove");

        assert!(set.get_by_handle(1).is_err());
        assert_eq!(set.all_tasks().count(), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn exhausted_handle_space_fails() {
        let mut set = TaskSet::default();
        // Pre-assign the whole handle index without building 10k tasks.
        for handle in 1..=MAX_HANDLE {
            set.by_handle.insert(handle, 0);
        }
        assert!(matches!(
            set.next_handle(),
            Err(Error::HandleSpaceExhausted(_))
        ));
    }
}
