//! Task data structure as served by the board backend.
//!
//! The backend is lenient about shapes: ids may be strings or numbers, optional
//! fields may be absent or `null`, and the status may hold anything. This module
//! accepts all of that and leaves interpretation to the classifier.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::fields::ColumnId;

/// Opaque task identifier, stable across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        TaskId::new(id)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TaskId(s),
            RawId::Number(n) => TaskId(n.to_string()),
        })
    }
}

/// A card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "assigneeName", alias = "assignee_name")]
    pub assignee: Option<String>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Task {
    /// Create a task with just an id, title and raw status.
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: Option<&str>) -> Self {
        Task {
            id: TaskId::new(id),
            title: title.into(),
            description: None,
            assignee: None,
            due_date: None,
            priority: None,
            status: status.map(str::to_string),
        }
    }

    /// Column this task belongs in according to its raw status.
    pub fn column(&self) -> ColumnId {
        ColumnId::classify(self.status.as_deref())
    }

    /// Due date as a calendar day. Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub fn due(&self) -> Option<NaiveDate> {
        let raw = self.due_date.as_deref()?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }
}

/// Body of `GET /projects/{id}/tasks`. Some deployments return a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TaskList {
    Wrapped { tasks: Vec<Task> },
    Bare(Vec<Task>),
}

impl TaskList {
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            TaskList::Wrapped { tasks } | TaskList::Bare(tasks) => tasks,
        }
    }
}
