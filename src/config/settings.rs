use super::ConfigError;
use crate::bridge::{ExecuteOptions, DEFAULT_BINARY};
use crate::shared::LogLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TRANSLATION_API_BASE: &str = "https://api.kimi.com/coding/v1";
pub const DEFAULT_TRANSLATION_MODEL: &str = "kimi-k2.5";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bridge: BridgeSettings,
    pub translation: TranslationSettings,
    pub engine: EngineSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSettings {
    pub binary: String,
    pub timeout_secs: u64,
    pub working_directory: Option<PathBuf>,
    pub allowed_tools: Vec<String>,
    pub append_system_prompt: Option<String>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            timeout_secs: 600,
            working_directory: None,
            allowed_tools: Vec::new(),
            append_system_prompt: None,
        }
    }
}

impl BridgeSettings {
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            cwd: self.working_directory.clone(),
            timeout: Some(Duration::from_secs(self.timeout_secs)),
            allowed_tools: self.allowed_tools.clone(),
            append_system_prompt: self.append_system_prompt.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationSettings {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub protocol_path: Option<PathBuf>,
    pub history_messages: usize,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TRANSLATION_API_BASE.to_string(),
            model: DEFAULT_TRANSLATION_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            request_timeout_secs: 60,
            protocol_path: None,
            history_messages: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub confidence_threshold: f64,
    pub max_history: usize,
    pub max_message_chars: usize,
    pub fallback_output_chars: usize,
    pub quick_replies: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_history: 20,
            max_message_chars: 4096,
            fallback_output_chars: 3000,
            quick_replies: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub path: Option<PathBuf>,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            path: None,
            level: LogLevel::Info.as_str().to_string(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Encode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.binary.trim().is_empty() {
            return Err(ConfigError::Settings(
                "bridge.binary must be non-empty".to_string(),
            ));
        }
        if self.bridge.timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "bridge.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some(dir) = &self.bridge.working_directory {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Settings(
                    "bridge.working_directory must be non-empty when set".to_string(),
                ));
            }
        }
        if self
            .bridge
            .allowed_tools
            .iter()
            .any(|tool| tool.trim().is_empty())
        {
            return Err(ConfigError::Settings(
                "bridge.allowed_tools entries must be non-empty".to_string(),
            ));
        }

        let translation = &self.translation;
        if translation.api_base.trim().is_empty() {
            return Err(ConfigError::Settings(
                "translation.api_base must be non-empty".to_string(),
            ));
        }
        if translation.model.trim().is_empty() {
            return Err(ConfigError::Settings(
                "translation.model must be non-empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&translation.temperature) {
            return Err(ConfigError::Settings(format!(
                "translation.temperature must be within 0..=2, got {}",
                translation.temperature
            )));
        }
        if translation.max_tokens == 0 || translation.request_timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "translation.max_tokens and translation.request_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }

        let engine = &self.engine;
        if !(0.0..=1.0).contains(&engine.confidence_threshold) {
            return Err(ConfigError::Settings(format!(
                "engine.confidence_threshold must be within 0..=1, got {}",
                engine.confidence_threshold
            )));
        }
        for (key, value) in [
            ("engine.max_history", engine.max_history),
            ("engine.max_message_chars", engine.max_message_chars),
            ("engine.fallback_output_chars", engine.fallback_output_chars),
        ] {
            if value == 0 {
                return Err(ConfigError::Settings(format!(
                    "{key} must be greater than 0"
                )));
            }
        }

        LogLevel::parse(&self.logging.level).map_err(ConfigError::Settings)?;
        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level).unwrap_or(LogLevel::Info)
    }
}
