pub mod columns;
pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod editor;
pub mod errors;
pub mod export;
pub mod filter;
pub mod models;
pub mod redaction;
pub mod selection;
pub mod session;
pub mod sources;
pub mod views;

pub use crate::config::DashboardConfig;
pub use crate::dashboard::{CommandCenter, CreatedTask};
pub use crate::dispatch::{ActionDispatcher, DispatchFailure, DispatchOutcome};
pub use crate::errors::{AppError, AppResult};
pub use crate::models::{Record, Snapshot, SourceKind, TaskForm};
pub use crate::sources::{SheetSource, SheetTransport};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
