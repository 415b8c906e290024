//! Task repository: the single owner of the local task collection.
//!
//! All reads and writes of the remote API go through [`TaskRepository`],
//! which reconciles the collection after each round trip. Operations take
//! `&self` and may be in flight at the same time; each one applies its local
//! change in a single step when its response arrives, so the last response
//! to land wins.

use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::FixedOffset;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, AppConfig};
use crate::error::{ApiError, ApiResult, TaskError};
use crate::models::{CreateTask, Task, TaskId};

/// Remote task resource (`/tasks`).
pub trait TaskApi: Send + Sync {
    /// `GET /tasks`
    fn list(&self) -> impl Future<Output = ApiResult<Vec<Task>>> + Send;

    /// `POST /tasks`
    fn create(&self, payload: &CreateTask) -> impl Future<Output = ApiResult<Task>> + Send;

    /// `PUT /tasks` with the full record
    fn update(&self, task: &Task) -> impl Future<Output = ApiResult<Task>> + Send;

    /// `DELETE /tasks/{id}`
    fn delete(&self, id: TaskId) -> impl Future<Output = ApiResult<()>> + Send;
}

/// [`TaskApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    api: ApiConfig,
}

impl HttpTaskApi {
    pub fn new(api: ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        Ok(Self { client, api })
    }

    pub fn tasks_url(&self) -> String {
        self.api.tasks_url()
    }
}

impl TaskApi for HttpTaskApi {
    async fn list(&self) -> ApiResult<Vec<Task>> {
        let url = self.api.tasks_url();
        debug!(%url, "GET tasks");
        let response = self.client.get(url).send().await?;
        parse_response(response).await
    }

    async fn create(&self, payload: &CreateTask) -> ApiResult<Task> {
        let url = self.api.tasks_url();
        debug!(%url, title = %payload.title, "POST task");
        let response = self.client.post(url).json(payload).send().await?;
        parse_response(response).await
    }

    async fn update(&self, task: &Task) -> ApiResult<Task> {
        let url = self.api.tasks_url();
        debug!(%url, id = task.id, "PUT task");
        let response = self.client.put(url).json(task).send().await?;
        parse_response(response).await
    }

    async fn delete(&self, id: TaskId) -> ApiResult<()> {
        let url = self.api.task_url(id);
        debug!(%url, "DELETE task");
        let response = self.client.delete(url).send().await?;
        ensure_success(response).await.map(|_| ())
    }
}

async fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    ensure_success(response)
        .await?
        .json()
        .await
        .map_err(ApiError::Decode)
}

/// Read-only view handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    pub items: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    items: Vec<Task>,
    in_flight: usize,
    error: Option<String>,
}

impl Inner {
    fn position(&self, id: TaskId) -> Option<usize> {
        self.items.iter().position(|t| t.id == id)
    }
}

pub struct TaskRepository<A> {
    api: A,
    state: RwLock<Inner>,
}

impl<A: TaskApi> TaskRepository<A> {
    pub fn new(api: A) -> Self {
        Self::with_tasks(api, Vec::new())
    }

    /// Repository seeded with an already known collection.
    pub fn with_tasks(api: A, items: Vec<Task>) -> Self {
        Self {
            api,
            state: RwLock::new(Inner {
                items,
                ..Inner::default()
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> BoardState {
        let inner = self.read();
        BoardState {
            items: inner.items.clone(),
            loading: inner.in_flight > 0,
            error: inner.error.clone(),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.read().items.clone()
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        let inner = self.read();
        inner.position(id).map(|i| inner.items[i].clone())
    }

    pub fn is_loading(&self) -> bool {
        self.read().in_flight > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Replaces the collection with the server's list. On failure the
    /// previous collection is kept.
    pub async fn fetch_all(&self) -> Result<Vec<Task>, TaskError> {
        self.begin(true);
        let result = self.api.list().await;

        let mut inner = self.write();
        inner.in_flight -= 1;
        match result {
            Ok(items) => {
                debug!(count = items.len(), "fetched tasks");
                inner.items = items.clone();
                Ok(items)
            }
            Err(e) => {
                warn!(error = %e, "fetching tasks failed");
                Self::fail(&mut inner, TaskError::Fetch(e))
            }
        }
    }

    /// Creates a task and appends the server's copy to the collection.
    pub async fn create(&self, payload: &CreateTask) -> Result<Task, TaskError> {
        self.begin(true);
        let result = self.api.create(payload).await;

        let mut inner = self.write();
        inner.in_flight -= 1;
        match result {
            Ok(task) => {
                info!(id = task.id, "task created");
                inner.items.push(task.clone());
                Ok(task)
            }
            Err(e) => {
                warn!(error = %e, "creating task failed");
                Self::fail(&mut inner, TaskError::Create(e))
            }
        }
    }

    /// Replaces a task. The local entry is patched before the request is
    /// sent and overwritten with the server's copy once it answers. A failed
    /// request leaves the patch in place and only records the error.
    pub async fn update(&self, task: &Task) -> Result<Task, TaskError> {
        {
            let mut inner = self.write();
            inner.in_flight += 1;
            if let Some(i) = inner.position(task.id) {
                let merged = inner.items[i].merged_with(task);
                debug!(id = task.id, "applying optimistic update");
                inner.items[i] = merged;
            }
        }
        let result = self.api.update(task).await;

        let mut inner = self.write();
        inner.in_flight -= 1;
        match result {
            Ok(updated) => {
                info!(id = updated.id, "task updated");
                if let Some(i) = inner.position(updated.id) {
                    inner.items[i] = updated.clone();
                }
                Ok(updated)
            }
            Err(e) => {
                warn!(id = task.id, error = %e, "updating task failed");
                Self::fail(&mut inner, TaskError::Update(e))
            }
        }
    }

    /// Deletes a task and drops it from the collection.
    pub async fn remove(&self, id: TaskId) -> Result<TaskId, TaskError> {
        self.begin(false);
        let result = self.api.delete(id).await;

        let mut inner = self.write();
        inner.in_flight -= 1;
        match result {
            Ok(()) => {
                info!(id, "task deleted");
                inner.items.retain(|t| t.id != id);
                Ok(id)
            }
            Err(e) => {
                warn!(id, error = %e, "deleting task failed");
                Self::fail(&mut inner, TaskError::Delete(e))
            }
        }
    }

    fn begin(&self, clear_error: bool) {
        let mut inner = self.write();
        inner.in_flight += 1;
        if clear_error {
            inner.error = None;
        }
    }

    fn fail<T>(inner: &mut Inner, error: TaskError) -> Result<T, TaskError> {
        inner.error = Some(error.to_string());
        Err(error)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything the CLI needs, built once from configuration.
pub struct AppState {
    pub config: AppConfig,
    pub offset: FixedOffset,
    pub repository: TaskRepository<HttpTaskApi>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let offset = config.offset()?;
        let api = HttpTaskApi::new(config.api.clone())?;
        info!(url = %api.tasks_url(), %offset, "task board client ready");
        Ok(Self {
            config,
            offset,
            repository: TaskRepository::new(api),
        })
    }
}
