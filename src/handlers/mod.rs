//! Board intents: what happens when a user creates, edits, views or deletes
//! a task. Each mutation validates first, calls the repository, then reloads
//! the full list.

use chrono::FixedOffset;
use thiserror::Error;
use tracing::warn;

use crate::board::{group, Buckets, TaskDetails};
use crate::datetime::{to_local_parts, LocalParts};
use crate::error::TaskError;
use crate::models::{Status, Task, TaskId};
use crate::services::{TaskApi, TaskRepository};
use crate::validation::{
    CreateTaskSchema, FieldErrors, TaskDraft, UpdateDraft, UpdateTaskSchema, ValidationContext,
};

#[derive(Error, Debug)]
pub enum HandlerError {
    /// Rejected before any request was made
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),

    /// Request failed; `notice` is the message shown to the user
    #[error("{notice}")]
    Failed {
        notice: &'static str,
        #[source]
        source: TaskError,
    },

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("cancelled")]
    Cancelled,
}

/// Edit form state for an existing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub due: LocalParts,
    pub status: Status,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl EditDraft {
    pub fn from_task(task: &Task, offset: FixedOffset) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due: to_local_parts(task.due_date.as_deref(), offset),
            status: task.status,
            created_at: task.created_at.clone(),
            completed_at: task.completed_at.clone(),
        }
    }

    pub fn to_update(&self) -> UpdateDraft {
        UpdateDraft {
            id: self.id,
            title: self.title.clone(),
            description: Some(self.description.clone()),
            due_date: self.due.to_wire(),
            status: i64::from(self.status.code()),
            created_at: self.created_at.clone(),
            completed_at: self.completed_at.clone(),
        }
    }
}

pub struct BoardHandlers<A> {
    repository: TaskRepository<A>,
    offset: FixedOffset,
}

impl<A: TaskApi> BoardHandlers<A> {
    pub fn new(repository: TaskRepository<A>, offset: FixedOffset) -> Self {
        Self { repository, offset }
    }

    pub fn repository(&self) -> &TaskRepository<A> {
        &self.repository
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Loads the board and returns its columns.
    pub async fn load(&self) -> Result<Buckets, HandlerError> {
        self.repository
            .fetch_all()
            .await
            .map_err(|source| HandlerError::Failed {
                notice: "Failed to load tasks",
                source,
            })?;
        Ok(self.buckets())
    }

    /// Columns of the collection as currently held.
    pub fn buckets(&self) -> Buckets {
        group(&self.repository.tasks())
    }

    pub fn details(&self, id: TaskId) -> Result<TaskDetails, HandlerError> {
        let task = self.find(id)?;
        Ok(TaskDetails::new(&task, self.offset))
    }

    pub async fn create(&self, draft: &TaskDraft) -> Result<Task, HandlerError> {
        let payload = CreateTaskSchema::new(self.context())
            .validate(draft)
            .map_err(HandlerError::Invalid)?;
        let task = self
            .repository
            .create(&payload)
            .await
            .map_err(|source| HandlerError::Failed {
                notice: "Failed to create task",
                source,
            })?;
        self.refresh().await;
        Ok(task)
    }

    pub fn begin_edit(&self, id: TaskId) -> Result<EditDraft, HandlerError> {
        let task = self.find(id)?;
        Ok(EditDraft::from_task(&task, self.offset))
    }

    pub async fn submit_edit(&self, draft: &EditDraft) -> Result<Task, HandlerError> {
        let task = UpdateTaskSchema::new(self.context())
            .validate(&draft.to_update())
            .map_err(HandlerError::Invalid)?;
        let updated = self
            .repository
            .update(&task)
            .await
            .map_err(|source| HandlerError::Failed {
                notice: "Failed to update task",
                source,
            })?;
        self.refresh().await;
        Ok(updated)
    }

    /// Deletes after `confirm` accepts the prompt.
    pub async fn delete<F>(&self, id: TaskId, confirm: F) -> Result<TaskId, HandlerError>
    where
        F: FnOnce(&str) -> bool,
    {
        let task = self.find(id)?;
        if !confirm(&format!("Delete task \"{}\"?", task.title)) {
            return Err(HandlerError::Cancelled);
        }
        let removed = self
            .repository
            .remove(id)
            .await
            .map_err(|source| HandlerError::Failed {
                notice: "Failed to delete task",
                source,
            })?;
        self.refresh().await;
        Ok(removed)
    }

    fn find(&self, id: TaskId) -> Result<Task, HandlerError> {
        self.repository.get(id).ok_or(HandlerError::NotFound(id))
    }

    fn context(&self) -> ValidationContext {
        ValidationContext::current(self.offset)
    }

    // A failed reload leaves the error on the repository state; the mutation
    // itself already succeeded.
    async fn refresh(&self) {
        if let Err(e) = self.repository.fetch_all().await {
            warn!(error = %e, "reload after mutation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use crate::models::CreateTask;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubApi {
        tasks: Mutex<Vec<Task>>,
        next_id: AtomicI64,
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl StubApi {
        fn seeded(tasks: Vec<Task>) -> Self {
            Self {
                tasks: Mutex::new(tasks),
                next_id: AtomicI64::new(10),
                ..Self::default()
            }
        }

        fn result<T>(&self, value: T) -> ApiResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(ApiError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                })
            } else {
                Ok(value)
            }
        }
    }

    impl TaskApi for StubApi {
        async fn list(&self) -> ApiResult<Vec<Task>> {
            let tasks = self.tasks.lock().unwrap().clone();
            self.result(tasks)
        }

        async fn create(&self, payload: &CreateTask) -> ApiResult<Task> {
            let task = Task {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                title: payload.title.clone(),
                description: payload.description.clone(),
                due_date: payload.due_date.clone(),
                status: Status::Todo,
                created_at: "2024-01-01T00:00:00".to_string(),
                completed_at: None,
            };
            let task = self.result(task)?;
            self.tasks.lock().unwrap().push(task.clone());
            Ok(task)
        }

        async fn update(&self, task: &Task) -> ApiResult<Task> {
            let task = self.result(task.clone())?;
            let mut tasks = self.tasks.lock().unwrap();
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                *slot = task.clone();
            }
            Ok(task)
        }

        async fn delete(&self, id: TaskId) -> ApiResult<()> {
            self.result(())?;
            self.tasks.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn task(id: TaskId, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: Some("details".to_string()),
            due_date: Some("2099-01-01T09:30:00".to_string()),
            status: Status::Todo,
            created_at: "2024-01-01T00:00:00".to_string(),
            completed_at: None,
        }
    }

    async fn loaded(tasks: Vec<Task>) -> BoardHandlers<StubApi> {
        let handlers = BoardHandlers::new(TaskRepository::new(StubApi::seeded(tasks)), utc());
        handlers.load().await.unwrap();
        handlers
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_network() {
        let handlers = loaded(vec![]).await;
        let before = handlers.repository().api().calls.load(Ordering::SeqCst);

        let draft = TaskDraft {
            title: "  ".to_string(),
            description: Some("x".to_string()),
            due_date: None,
        };
        match handlers.create(&draft).await {
            Err(HandlerError::Invalid(errors)) => {
                assert_eq!(errors.get("title"), Some("Title is required"))
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(handlers.repository().api().calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn create_reloads_board() {
        let handlers = loaded(vec![task(1, "first")]).await;
        let draft = TaskDraft {
            title: " second ".to_string(),
            description: None,
            due_date: Some("2099-05-01T18:00:00".to_string()),
        };

        let created = handlers.create(&draft).await.unwrap();
        assert_eq!(created.title, "second");
        assert_eq!(handlers.buckets().todo.len(), 2);
    }

    #[tokio::test]
    async fn failed_create_surfaces_notice() {
        let handlers = loaded(vec![]).await;
        handlers.repository().api().failing.store(true, Ordering::SeqCst);
        let draft = TaskDraft {
            title: "t".to_string(),
            ..TaskDraft::default()
        };

        let err = handlers.create(&draft).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to create task");
        assert!(handlers.repository().tasks().is_empty());
    }

    #[tokio::test]
    async fn edit_round_trips_due_date_and_moves_column() {
        let handlers = loaded(vec![task(1, "first")]).await;
        let mut draft = handlers.begin_edit(1).unwrap();
        assert_eq!(draft.due, LocalParts::new("2099-01-01", "09:30"));
        assert_eq!(draft.description, "details");

        draft.status = Status::InProgress;
        draft.description = "   ".to_string();
        let updated = handlers.submit_edit(&draft).await.unwrap();

        assert_eq!(updated.due_date.as_deref(), Some("2099-01-01T09:30:00"));
        assert_eq!(updated.description, None);
        let buckets = handlers.buckets();
        assert!(buckets.todo.is_empty());
        assert_eq!(buckets.in_progress[0].id, 1);
    }

    #[tokio::test]
    async fn clearing_due_date_sends_none() {
        let handlers = loaded(vec![task(1, "first")]).await;
        let mut draft = handlers.begin_edit(1).unwrap();
        draft.due = LocalParts::default();
        let updated = handlers.submit_edit(&draft).await.unwrap();
        assert_eq!(updated.due_date, None);
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let handlers = loaded(vec![task(1, "first")]).await;

        let mut prompt = String::new();
        let err = handlers
            .delete(1, |p| {
                prompt = p.to_string();
                false
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Cancelled));
        assert_eq!(prompt, "Delete task \"first\"?");
        assert!(handlers.repository().get(1).is_some());

        assert_eq!(handlers.delete(1, |_| true).await.unwrap(), 1);
        assert!(handlers.repository().get(1).is_none());
    }

    #[tokio::test]
    async fn failed_delete_keeps_task() {
        let handlers = loaded(vec![task(1, "first")]).await;
        handlers.repository().api().failing.store(true, Ordering::SeqCst);

        let err = handlers.delete(1, |_| true).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete task");
        match err {
            HandlerError::Failed { source, .. } => assert_eq!(source.kind(), "delete-error"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(handlers.repository().get(1).is_some());
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let handlers = loaded(vec![]).await;
        assert!(matches!(handlers.details(3), Err(HandlerError::NotFound(3))));
        assert!(matches!(handlers.begin_edit(3), Err(HandlerError::NotFound(3))));
    }
}
