//! Column grouping and the read-only views rendered on the board.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::datetime::{display, parse_wire};
use crate::models::{Status, Task, TaskId};

pub const CARD_DESCRIPTION_LEN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnId {
    Todo,
    InProgress,
    Done,
}

pub const COLUMN_ORDER: [ColumnId; 3] = [ColumnId::Todo, ColumnId::InProgress, ColumnId::Done];

impl ColumnId {
    pub fn title(self) -> &'static str {
        match self {
            ColumnId::Todo => "Todo",
            ColumnId::InProgress => "In Progress",
            ColumnId::Done => "Done",
        }
    }
}

impl From<Status> for ColumnId {
    fn from(status: Status) -> Self {
        match status {
            Status::Todo => ColumnId::Todo,
            Status::InProgress => ColumnId::InProgress,
            Status::Done => ColumnId::Done,
        }
    }
}

/// Tasks split by column, each bucket in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buckets {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub done: Vec<Task>,
}

impl Buckets {
    pub fn get(&self, column: ColumnId) -> &[Task] {
        match column {
            ColumnId::Todo => &self.todo,
            ColumnId::InProgress => &self.in_progress,
            ColumnId::Done => &self.done,
        }
    }

    pub fn len(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stable partition of `tasks` by status.
pub fn group(tasks: &[Task]) -> Buckets {
    let mut buckets = Buckets::default();
    for task in tasks {
        let bucket = match ColumnId::from(task.status) {
            ColumnId::Todo => &mut buckets.todo,
            ColumnId::InProgress => &mut buckets.in_progress,
            ColumnId::Done => &mut buckets.done,
        };
        bucket.push(task.clone());
    }
    buckets
}

/// Shortens a description for a card. Lengths are in characters.
pub fn ellipsize(text: Option<&str>, max: usize) -> String {
    match text {
        None | Some("") => "No description".to_string(),
        Some(t) if t.chars().count() > max => {
            let mut short: String = t.chars().take(max.saturating_sub(1)).collect();
            short.push('…');
            short
        }
        Some(t) => t.to_string(),
    }
}

pub fn is_overdue(task: &Task, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    task.due_date
        .as_deref()
        .and_then(|due| parse_wire(due, offset))
        .is_some_and(|due| due.with_timezone(&Utc) < now)
}

/// What a task card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub id: TaskId,
    pub title: String,
    pub summary: String,
    pub due: Option<String>,
    pub overdue: bool,
}

impl TaskCard {
    pub fn new(task: &Task, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            summary: ellipsize(task.description.as_deref(), CARD_DESCRIPTION_LEN),
            due: task.due_date.as_deref().and_then(|d| display(d, offset)),
            overdue: is_overdue(task, now, offset),
        }
    }
}

/// Label/value rows of the details dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    pub rows: Vec<(&'static str, String)>,
}

impl TaskDetails {
    pub fn new(task: &Task, offset: FixedOffset) -> Self {
        let when = |wire: Option<&str>| {
            wire.map(|w| display(w, offset).unwrap_or_else(|| w.to_string()))
                .unwrap_or_else(|| "—".to_string())
        };
        Self {
            rows: vec![
                ("Title", task.title.clone()),
                (
                    "Description",
                    task.description.clone().unwrap_or_else(|| "—".to_string()),
                ),
                ("Status", task.status.label().to_string()),
                ("Due date", when(task.due_date.as_deref())),
                ("Created", when(Some(&task.created_at))),
                ("Completed", when(task.completed_at.as_deref())),
            ],
        }
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }
}
