//! Error types for the task board

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for transport calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure talking to the task API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request never produced a response (connect, timeout, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Response body did not match the expected shape
    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Coarse failure of a repository operation. The message is what the board
/// shows; the transport detail stays in the source chain.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Fetch error")]
    Fetch(#[source] ApiError),

    #[error("Create error")]
    Create(#[source] ApiError),

    #[error("Update error")]
    Update(#[source] ApiError),

    #[error("Delete error")]
    Delete(#[source] ApiError),
}

impl TaskError {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Fetch(_) => "fetch-error",
            TaskError::Create(_) => "create-error",
            TaskError::Update(_) => "update-error",
            TaskError::Delete(_) => "delete-error",
        }
    }

    pub fn api_error(&self) -> &ApiError {
        match self {
            TaskError::Fetch(e)
            | TaskError::Create(e)
            | TaskError::Update(e)
            | TaskError::Delete(e) => e,
        }
    }
}
