//! Enumerations and field types for the task board.
//!
//! This module defines the fixed set of board columns, the classifier that maps
//! a raw server status onto one of them, and the kinds of realtime change the
//! board reacts to.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Workflow stage a task is shown under. The set and its order never change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnId {
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
}

impl ColumnId {
    /// All columns in display order.
    pub const ALL: [ColumnId; 5] = [
        ColumnId::Backlog,
        ColumnId::Todo,
        ColumnId::InProgress,
        ColumnId::Review,
        ColumnId::Done,
    ];

    /// Canonical uppercase token, as sent to and received from the server.
    pub fn token(self) -> &'static str {
        match self {
            ColumnId::Backlog => "BACKLOG",
            ColumnId::Todo => "TODO",
            ColumnId::InProgress => "IN_PROGRESS",
            ColumnId::Review => "REVIEW",
            ColumnId::Done => "DONE",
        }
    }

    /// Human-readable column heading.
    pub fn title(self) -> &'static str {
        match self {
            ColumnId::Backlog => "Backlog",
            ColumnId::Todo => "To-Do",
            ColumnId::InProgress => "In Progress",
            ColumnId::Review => "Review",
            ColumnId::Done => "Done",
        }
    }

    /// Position of this column in [`ColumnId::ALL`].
    pub fn index(self) -> usize {
        match self {
            ColumnId::Backlog => 0,
            ColumnId::Todo => 1,
            ColumnId::InProgress => 2,
            ColumnId::Review => 3,
            ColumnId::Done => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<ColumnId> {
        Self::ALL.get(index).copied()
    }

    /// Map a raw, possibly missing or unknown status onto a column.
    ///
    /// Missing, empty and unrecognised values all land in `Backlog` so that a
    /// task with a strange status is still shown rather than dropped.
    pub fn classify(raw: Option<&str>) -> ColumnId {
        let Some(raw) = raw else {
            return ColumnId::Backlog;
        };
        let upper = raw.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|column| column.token() == upper)
            .unwrap_or(ColumnId::Backlog)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Task change announced by a realtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Parse a payload `kind`. Kinds that do not touch tasks return `None`.
    pub fn from_kind(kind: &str) -> Option<ChangeKind> {
        match kind {
            "task_created" => Some(ChangeKind::Created),
            "task_updated" | "task_status_changed" => Some(ChangeKind::Updated),
            "task_deleted" => Some(ChangeKind::Deleted),
            _ => None,
        }
    }

    /// Short notice shown to the user after a remote change.
    pub fn notice(self) -> &'static str {
        match self {
            ChangeKind::Created => "Task created",
            ChangeKind::Updated => "Task updated",
            ChangeKind::Deleted => "Task deleted",
        }
    }
}

/// What to do when persisting an optimistic move fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PersistFailurePolicy {
    /// Log and keep the optimistic state until the next reload.
    #[default]
    #[serde(alias = "log")]
    LogOnly,
    /// Log and immediately reload from the server.
    Reload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_known_tokens_any_case() {
        assert_eq!(ColumnId::classify(Some("todo")), ColumnId::Todo);
        assert_eq!(ColumnId::classify(Some("In_Progress")), ColumnId::InProgress);
        assert_eq!(ColumnId::classify(Some("REVIEW")), ColumnId::Review);
        assert_eq!(ColumnId::classify(Some("done")), ColumnId::Done);
        assert_eq!(ColumnId::classify(Some("backlog")), ColumnId::Backlog);
    }

    #[test]
    fn test_classify_falls_back_to_backlog() {
        assert_eq!(ColumnId::classify(None), ColumnId::Backlog);
        assert_eq!(ColumnId::classify(Some("")), ColumnId::Backlog);
        assert_eq!(ColumnId::classify(Some("weird_unknown_value")), ColumnId::Backlog);
        assert_eq!(ColumnId::classify(Some("in progress")), ColumnId::Backlog);
        assert_eq!(ColumnId::classify(Some(" todo")), ColumnId::Backlog);
    }

    #[test]
    fn test_index_round_trips_through_all() {
        for (i, column) in ColumnId::ALL.into_iter().enumerate() {
            assert_eq!(column.index(), i);
            assert_eq!(ColumnId::from_index(i), Some(column));
        }
        assert_eq!(ColumnId::from_index(5), None);
    }

    #[test]
    fn test_change_kind_parsing() {
        assert_eq!(ChangeKind::from_kind("task_created"), Some(ChangeKind::Created));
        assert_eq!(ChangeKind::from_kind("task_status_changed"), Some(ChangeKind::Updated));
        assert_eq!(ChangeKind::from_kind("task_deleted"), Some(ChangeKind::Deleted));
        assert_eq!(ChangeKind::from_kind("invoice_paid"), None);
    }

    #[test]
    fn test_persist_policy_accepts_short_alias() {
        let policy: PersistFailurePolicy = serde_json::from_str("\"log\"").unwrap();
        assert_eq!(policy, PersistFailurePolicy::LogOnly);
        let policy: PersistFailurePolicy = serde_json::from_str("\"reload\"").unwrap();
        assert_eq!(policy, PersistFailurePolicy::Reload);
    }

    proptest! {
        #[test]
        fn classify_is_total(raw in proptest::option::of(".*")) {
            let column = ColumnId::classify(raw.as_deref());
            prop_assert!(ColumnId::ALL.contains(&column));
        }

        #[test]
        fn classify_ignores_case(idx in 0usize..5, mask in proptest::collection::vec(any::<bool>(), 11)) {
            let column = ColumnId::ALL[idx];
            let mixed: String = column
                .token()
                .chars()
                .zip(mask.iter().cycle())
                .map(|(c, lower)| if *lower { c.to_ascii_lowercase() } else { c })
                .collect();
            prop_assert_eq!(ColumnId::classify(Some(&mixed)), column);
        }
    }
}
