use crate::bridge::ProcessBridge;
use crate::config::{load_global_settings, resolve_config_path, ConfigError, Settings};
use crate::jobs::{JobManager, JobProgressEvent, ProgressKind};
use crate::shared::RuntimeLog;
use std::path::PathBuf;

pub const ACCESS_TOKEN_ENV: &str = "ADEGATE_ACCESS_TOKEN";
pub const CLI_OWNER: &str = "cli";

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn config_path() -> Result<PathBuf, String> {
    resolve_config_path().map_err(map_config_err)
}

pub fn load_settings() -> Result<Settings, String> {
    load_global_settings().map_err(map_config_err)
}

pub fn runtime_log(settings: &Settings) -> RuntimeLog {
    RuntimeLog::from_settings(settings.logging.path.as_deref(), settings.log_level())
}

pub fn job_manager(settings: &Settings, log: &RuntimeLog) -> JobManager {
    let bridge = ProcessBridge::new(settings.bridge.binary.clone()).with_log(log.clone());
    JobManager::new(bridge, settings.bridge.execute_options(), log.clone())
}

pub fn access_token() -> Option<String> {
    std::env::var(ACCESS_TOKEN_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn require_access_token() -> Result<String, String> {
    access_token().ok_or_else(|| format!("{ACCESS_TOKEN_ENV} must be set"))
}

/// One-line stderr rendering of a progress event.
pub fn progress_line(event: &JobProgressEvent) -> String {
    let id = &event.job_id;
    match event.kind {
        ProgressKind::Output => event
            .content
            .as_deref()
            .unwrap_or_default()
            .trim_end()
            .to_string(),
        ProgressKind::Started => format!("[{id}] started"),
        ProgressKind::Completed => format!("[{id}] completed"),
        ProgressKind::Cancelled => format!("[{id}] cancelled"),
        ProgressKind::Failed => {
            let error = event
                .content
                .as_deref()
                .or(event.job.error.as_deref())
                .unwrap_or("unknown error");
            format!("[{id}] failed: {error}")
        }
    }
}
