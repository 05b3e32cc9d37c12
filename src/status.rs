//! Task status lifecycle.
//!
//! Statuses double as on-disk bucket names: every task record lives in a
//! directory named after its status, so the enum's `dir_name` is part of the
//! persistence contract.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Active,
    Paused,
    Delegated,
    Deferred,
    Recurring,
    Template,
    Resolved,
}

/// Legal status transitions. Anything not listed here is rejected.
const TRANSITIONS: [(Status, Status); 7] = [
    (Status::Pending, Status::Active),
    (Status::Active, Status::Paused),
    (Status::Paused, Status::Active),
    (Status::Pending, Status::Resolved),
    (Status::Paused, Status::Resolved),
    (Status::Active, Status::Resolved),
    (Status::Pending, Status::Template),
];

/// All statuses, in on-disk enumeration order.
pub const ALL_STATUSES: [Status; 8] = [
    Status::Pending,
    Status::Active,
    Status::Paused,
    Status::Delegated,
    Status::Deferred,
    Status::Recurring,
    Status::Template,
    Status::Resolved,
];

/// Statuses shown by default listings and eligible for integer handles.
pub const OPEN_STATUSES: [Status; 6] = [
    Status::Pending,
    Status::Active,
    Status::Paused,
    Status::Delegated,
    Status::Deferred,
    Status::Recurring,
];

/// Display order used by the priority sort: active work floats to the top,
/// resolved sinks to the bottom.
const SORT_ORDER: [Status; 8] = [
    Status::Active,
    Status::Pending,
    Status::Delegated,
    Status::Deferred,
    Status::Paused,
    Status::Recurring,
    Status::Template,
    Status::Resolved,
];

impl Status {
    /// Directory name for this status bucket.
    pub fn dir_name(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Active => "active",
            Status::Paused => "paused",
            Status::Delegated => "delegated",
            Status::Deferred => "deferred",
            Status::Recurring => "recurring",
            Status::Template => "template",
            Status::Resolved => "resolved",
        }
    }

    /// Parse a status from its bucket/display name.
    pub fn parse(value: &str) -> Option<Status> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.dir_name().eq_ignore_ascii_case(value.trim()))
    }

    /// Whether tasks in this status appear in default "open" listings.
    pub fn is_open(self) -> bool {
        !matches!(self, Status::Resolved | Status::Template)
    }

    /// Whether tasks in this status are addressable by an integer handle.
    /// Everything short of resolved keeps one, templates included.
    pub fn carries_handle(self) -> bool {
        self != Status::Resolved
    }

    /// Rank within the listing sort order.
    pub fn sort_rank(self) -> usize {
        SORT_ORDER
            .iter()
            .position(|entry| *entry == self)
            .unwrap_or(SORT_ORDER.len())
    }

    /// Whether a transition from `self` to `to` is legal.
    pub fn can_transition_to(self, to: Status) -> bool {
        TRANSITIONS.contains(&(self, to))
    }

    /// Validate a transition, producing the error the mutation path reports.
    pub fn check_transition(self, to: Status) -> Result<()> {
        if self == to || self.can_transition_to(to) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.dir_name().to_string(),
                to: to.dir_name().to_string(),
            })
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_accepted() {
        for (from, to) in TRANSITIONS {
            assert!(from.can_transition_to(to), "{from} -> {to} should be legal");
            from.check_transition(to).expect("transition check");
        }
    }

    #[test]
    fn every_other_pair_rejected() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                if from == to || TRANSITIONS.contains(&(from, to)) {
                    continue;
                }
                let err = from.check_transition(to).unwrap_err();
                assert!(
                    matches!(err, Error::InvalidTransition { .. }),
                    "{from} -> {to} should be InvalidTransition"
                );
            }
        }
    }

    #[test]
    fn self_transition_is_a_no_op() {
        for status in ALL_STATUSES {
            status.check_transition(status).expect("no-op transition");
        }
    }

    #[test]
    fn resolved_to_active_rejected() {
        assert!(!Status::Resolved.can_transition_to(Status::Active));
    }

    #[test]
    fn parse_round_trips_dir_names() {
        for status in ALL_STATUSES {
            assert_eq!(Status::parse(status.dir_name()), Some(status));
            assert_eq!(Status::parse(&status.dir_name().to_uppercase()), Some(status));
        }
        assert_eq!(Status::parse("nonsense"), None);
    }

    #[test]
    fn open_excludes_resolved_and_template() {
        assert!(!Status::Resolved.is_open());
        assert!(!Status::Template.is_open());
        for status in OPEN_STATUSES {
            assert!(status.is_open());
        }
    }
}
