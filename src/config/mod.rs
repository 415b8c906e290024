use chrono::{FixedOffset, Local};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::TaskId;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub board: BoardConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub tasks_path: String,
    /// Transport-level request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BoardConfig {
    pub time_step_minutes: u32,
    /// Local wall-clock offset; host offset when unset
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Defaults
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.tasks_path", "/tasks")?
            .set_default("api.timeout_secs", 30)?
            .set_default("board.time_step_minutes", 30)?
            // Optional task-board.toml in the working directory
            .add_source(File::with_name("task-board").required(false))
            // Environment, e.g. TASK_BOARD_API__BASE_URL
            .add_source(
                Environment::with_prefix("TASK_BOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        match self.board.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                ConfigError::Message(format!("board.utc_offset_minutes out of range: {minutes}"))
            }),
            None => Ok(*Local::now().offset()),
        }
    }
}

impl ApiConfig {
    pub fn tasks_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.tasks_path.trim_start_matches('/')
        )
    }

    pub fn task_url(&self, id: TaskId) -> String {
        format!("{}/{id}", self.tasks_url())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            tasks_path: "/tasks".to_string(),
            timeout_secs: 30,
        }
    }
}
