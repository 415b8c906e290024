//! Client-side schemas for create and update payloads.
//!
//! Validation is pure: it never touches the network and never mutates its
//! input. It returns either the normalized payload or a [`FieldErrors`] map
//! holding the first message reported for each failing field.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::datetime::parse_wire;
use crate::models::{CreateTask, Status, Task, TaskId};

pub const MSG_TITLE_REQUIRED: &str = "Title is required";
pub const MSG_DUE_INVALID: &str = "DueDate is not a valid date";
pub const MSG_DUE_PAST: &str = "DueDate cannot be in the past (UTC)";
pub const MSG_INVALID_STATUS: &str = "Invalid status";

/// Key used for errors that belong to the payload as a whole.
pub const FORM_FIELD: &str = "form";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// One of `required`, `max-length`, `invalid-date`, `due-in-past`,
    /// `invalid-status`, `invalid-shape`.
    pub code: &'static str,
    pub message: String,
}

/// Field name to first error, in the order fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, FieldError)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error unless the field already has one.
    pub fn add(&mut self, field: &str, code: &'static str, message: impl Into<String>) {
        if self.entries.iter().any(|(f, _)| f == field) {
            return;
        }
        self.entries.push((
            field.to_string(),
            FieldError {
                code,
                message: message.into(),
            },
        ));
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.error(field).map(|e| e.message.as_str())
    }

    pub fn code(&self, field: &str) -> Option<&'static str> {
        self.error(field).map(|e| e.code)
    }

    pub fn error(&self, field: &str) -> Option<&FieldError> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, e)| e)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(f, e)| (f.as_str(), e.message.as_str()))
    }

    /// Distinct non-empty messages, for an error summary box.
    pub fn summary(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (_, e) in &self.entries {
            let message = e.message.as_str();
            if !message.is_empty() && !seen.contains(&message) {
                seen.push(message);
            }
        }
        seen
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, e)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {}", e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// The instant and local offset a payload is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl ValidationContext {
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn current(offset: FixedOffset) -> Self {
        Self::at(Utc::now(), offset)
    }
}

/// Create form contents before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// Full replacement record before validation. `status` is kept raw so that
/// out-of-range codes reach the schema instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateDraft {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub status: i64,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl From<&Task> for UpdateDraft {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.clone(),
            status: i64::from(task.status.code()),
            created_at: task.created_at.clone(),
            completed_at: task.completed_at.clone(),
        }
    }
}

#[derive(Debug, Validate)]
struct TextFields {
    #[validate(length(max = 200, message = "Title must have a maximum length of 200 characters"))]
    title: String,
    #[validate(length(
        max = 4000,
        message = "Description must have a maximum length of 4000 characters"
    ))]
    description: Option<String>,
}

impl TextFields {
    fn normalize(title: &str, description: Option<&str>) -> Self {
        Self {
            title: title.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        }
    }

    fn check(&self, errors: &mut FieldErrors) {
        if self.title.is_empty() {
            errors.add("title", "required", MSG_TITLE_REQUIRED);
        }
        if let Err(report) = self.validate() {
            collect_length_errors(&report, errors);
        }
    }
}

fn collect_length_errors(report: &ValidationErrors, errors: &mut FieldErrors) {
    let by_field = report.field_errors();
    for field in ["title", "description"] {
        if let Some(first) = by_field.get(field).and_then(|list| list.first()) {
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is too long"));
            errors.add(field, "max-length", message);
        }
    }
}

/// Empty means no due date; anything else must parse, and with `reject_past`
/// must not lie before `ctx.now`.
fn check_due_date(
    due_date: Option<&str>,
    ctx: &ValidationContext,
    reject_past: bool,
    errors: &mut FieldErrors,
) -> Option<String> {
    let due = due_date.map(str::trim).filter(|d| !d.is_empty())?;
    match parse_wire(due, ctx.offset) {
        None => errors.add("dueDate", "invalid-date", MSG_DUE_INVALID),
        Some(instant) if reject_past && instant.with_timezone(&Utc) < ctx.now => {
            errors.add("dueDate", "due-in-past", MSG_DUE_PAST)
        }
        Some(_) => {}
    }
    Some(due.to_string())
}

#[derive(Debug, Clone, Copy)]
pub struct CreateTaskSchema {
    ctx: ValidationContext,
}

impl CreateTaskSchema {
    pub fn new(ctx: ValidationContext) -> Self {
        Self { ctx }
    }

    pub fn validate(&self, draft: &TaskDraft) -> Result<CreateTask, FieldErrors> {
        let mut errors = FieldErrors::new();
        let text = TextFields::normalize(&draft.title, draft.description.as_deref());
        text.check(&mut errors);
        let due_date = check_due_date(draft.due_date.as_deref(), &self.ctx, true, &mut errors);

        errors.into_result(|| CreateTask {
            title: text.title,
            description: text.description,
            due_date,
        })
    }
}

/// Updates may keep a due date that has since passed, so only parseability
/// is checked for `dueDate`.
#[derive(Debug, Clone, Copy)]
pub struct UpdateTaskSchema {
    ctx: ValidationContext,
}

impl UpdateTaskSchema {
    pub fn new(ctx: ValidationContext) -> Self {
        Self { ctx }
    }

    pub fn validate(&self, draft: &UpdateDraft) -> Result<Task, FieldErrors> {
        let mut errors = FieldErrors::new();
        let text = TextFields::normalize(&draft.title, draft.description.as_deref());
        text.check(&mut errors);
        let due_date = check_due_date(draft.due_date.as_deref(), &self.ctx, false, &mut errors);
        let status = match Status::try_from(draft.status) {
            Ok(status) => Some(status),
            Err(_) => {
                errors.add("status", "invalid-status", MSG_INVALID_STATUS);
                None
            }
        };

        match status {
            Some(status) if errors.is_empty() => Ok(Task {
                id: draft.id,
                title: text.title,
                description: text.description,
                due_date,
                status,
                created_at: draft.created_at.clone(),
                completed_at: draft.completed_at.clone(),
            }),
            _ => Err(errors),
        }
    }

    /// Validates an untyped payload. Missing required fields, wrong types and
    /// unknown fields are reported under [`FORM_FIELD`].
    pub fn validate_json(&self, payload: serde_json::Value) -> Result<Task, FieldErrors> {
        let draft: UpdateDraft = serde_json::from_value(payload).map_err(|e| {
            let mut errors = FieldErrors::new();
            errors.add(FORM_FIELD, "invalid-shape", e.to_string());
            errors
        })?;
        self.validate(&draft)
    }
}
