//! Kanban task board client.
//!
//! Keeps a local copy of the task list in sync with a REST backend and
//! provides the validation, date handling and column grouping the board needs.

pub mod board;
pub mod config;
pub mod datetime;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod validation;

pub use error::{ApiError, TaskError};
pub use models::{CreateTask, Status, Task, TaskId};
pub use services::{HttpTaskApi, TaskApi, TaskRepository};
