pub mod cli;
pub mod config;
pub mod rest;
pub mod storage;
pub mod tasks;
pub mod ui;

use std::sync::Arc;

use config::TodoConfig;
use tasks::TaskService;

/// Shared application state passed to every REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TodoConfig>,
    pub tasks: TaskService,
    pub started_at: std::time::Instant,
}
