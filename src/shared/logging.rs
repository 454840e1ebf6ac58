use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOG_LEVEL_ENV: &str = "ADEGATE_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "log level `{other}` must be one of: debug, info, warn, error"
            )),
        }
    }
}

/// Append-only JSON-lines event log. A log without a path drops every record.
#[derive(Debug, Clone)]
pub struct RuntimeLog {
    path: Option<PathBuf>,
    min_level: LogLevel,
}

impl Default for RuntimeLog {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RuntimeLog {
    pub fn new(path: impl Into<PathBuf>, min_level: LogLevel) -> Self {
        Self {
            path: Some(path.into()),
            min_level,
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            min_level: LogLevel::Error,
        }
    }

    /// Resolve the minimum level from `ADEGATE_LOG_LEVEL`, falling back to `configured`.
    pub fn from_settings(path: Option<&Path>, configured: LogLevel) -> Self {
        let level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|raw| LogLevel::parse(&raw).ok())
            .unwrap_or(configured);
        match path {
            Some(path) => Self::new(path, level),
            None => Self::disabled(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn debug(&self, event: &str, message: &str, fields: Value) {
        self.record(LogLevel::Debug, event, message, fields);
    }

    pub fn info(&self, event: &str, message: &str, fields: Value) {
        self.record(LogLevel::Info, event, message, fields);
    }

    pub fn warn(&self, event: &str, message: &str, fields: Value) {
        self.record(LogLevel::Warn, event, message, fields);
    }

    pub fn error(&self, event: &str, message: &str, fields: Value) {
        self.record(LogLevel::Error, event, message, fields);
    }

    pub fn record(&self, level: LogLevel, event: &str, message: &str, fields: Value) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if level < self.min_level {
            return;
        }

        let mut payload = Map::new();
        payload.insert("timestamp".to_string(), Value::from(super::now_millis()));
        payload.insert("level".to_string(), Value::from(level.as_str()));
        payload.insert("event".to_string(), Value::from(event));
        payload.insert("message".to_string(), Value::from(message));
        if let Value::Object(extra) = fields {
            for (key, value) in extra {
                payload.entry(key).or_insert(value);
            }
        }

        let Ok(line) = serde_json::to_string(&Value::Object(payload)) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn records_are_json_lines_with_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("logs/adegate.log");
        let log = RuntimeLog::new(&path, LogLevel::Info);

        log.info("job.created", "job created", json!({"jobId": "job-1"}));
        log.debug("job.chunk", "dropped below minimum", json!({}));
        log.error("job.failed", "boom", json!({"level": "ignored"}));

        let raw = fs::read_to_string(&path).expect("read log");
        let lines: Vec<Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "job.created");
        assert_eq!(lines[0]["jobId"], "job-1");
        assert_eq!(lines[1]["level"], "error");
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = RuntimeLog::disabled();
        log.error("anything", "message", json!({}));
        assert!(log.path().is_none());
    }

    #[test]
    fn level_parser_accepts_aliases() {
        assert_eq!(LogLevel::parse("WARNING").expect("parse"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("trace").expect("parse"), LogLevel::Debug);
        assert!(LogLevel::parse("loud").is_err());
    }
}
