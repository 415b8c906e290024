use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Server-assigned task identifier.
pub type TaskId = i64;

/// Board status of a task. Travels on the wire as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Todo = 0,
    InProgress = 1,
    Done = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "Todo",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i64> for Status {
    type Error = InvalidStatus;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Status::Todo),
            1 => Ok(Status::InProgress),
            2 => Ok(Status::Done),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Accepts the numeric code or a label, e.g. `1`, `in-progress`, `"In Progress"`.
impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(raw) = trimmed.parse::<i64>() {
            return Status::try_from(raw);
        }
        let key: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "todo" => Ok(Status::Todo),
            "inprogress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            _ => Err(InvalidStatus(trimmed.to_string())),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Status::try_from(raw).map_err(de::Error::custom)
    }
}

/// A task as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub status: Status,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Task {
    /// Shallow merge of a submitted update over this entry. Fields carried by the
    /// update win; `completed_at` is kept when the update leaves it unset.
    pub fn merged_with(&self, update: &Task) -> Task {
        Task {
            id: self.id,
            title: update.title.clone(),
            description: update.description.clone(),
            due_date: update.due_date.clone(),
            status: update.status,
            created_at: update.created_at.clone(),
            completed_at: update
                .completed_at
                .clone()
                .or_else(|| self.completed_at.clone()),
        }
    }
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> Task {
        Task {
            id: 1,
            title: "Write report".to_string(),
            description: None,
            due_date: Some("2030-01-01T09:00:00".to_string()),
            status: Status::InProgress,
            created_at: "2024-01-01T08:00:00".to_string(),
            completed_at: None,
        }
    }

    #[test]
    fn task_uses_camel_case_and_numeric_status() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status"], 1);
        assert_eq!(json["dueDate"], "2030-01-01T09:00:00");
        assert_eq!(json["createdAt"], "2024-01-01T08:00:00");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn task_deserializes_null_optionals() {
        let task: Task = serde_json::from_str(
            r#"{"id":3,"title":"t","description":null,"dueDate":null,"status":2,"createdAt":"2024-01-01T00:00:00","completedAt":null}"#,
        )
        .unwrap();
        assert_eq!(task.status, Status::Done);
        assert_eq!(task.description, None);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn unknown_status_code_is_rejected() {
        let result: Result<Task, _> = serde_json::from_str(
            r#"{"id":3,"title":"t","status":7,"createdAt":"2024-01-01T00:00:00"}"#,
        );
        assert!(result.is_err());
    }

    #[rstest]
    #[case("0", Status::Todo)]
    #[case("1", Status::InProgress)]
    #[case("in-progress", Status::InProgress)]
    #[case("In Progress", Status::InProgress)]
    #[case("DONE", Status::Done)]
    #[case(" todo ", Status::Todo)]
    fn status_parses_codes_and_labels(#[case] input: &str, #[case] expected: Status) {
        assert_eq!(input.parse::<Status>().unwrap(), expected);
    }

    #[rstest]
    #[case("7")]
    #[case("-1")]
    #[case("blocked")]
    fn status_rejects_unknown_values(#[case] input: &str) {
        assert!(input.parse::<Status>().is_err());
    }

    #[test]
    fn merge_takes_update_fields_and_keeps_completion_when_unset() {
        let mut existing = sample();
        existing.completed_at = Some("2024-02-01T10:00:00".to_string());
        let mut update = sample();
        update.title = "Renamed".to_string();
        update.status = Status::Done;

        let merged = existing.merged_with(&update);
        assert_eq!(merged.title, "Renamed");
        assert_eq!(merged.status, Status::Done);
        assert_eq!(merged.completed_at.as_deref(), Some("2024-02-01T10:00:00"));
    }
}
