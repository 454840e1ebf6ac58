use super::{resolve_config_path, ConfigError, Settings};
use std::path::Path;

pub const TRANSLATION_API_BASE_ENV: &str = "ADEGATE_TRANSLATION_API_BASE";

pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = resolve_config_path()?;
    load_settings(&path)
}

/// Load, apply environment overrides, then validate. A missing file yields
/// the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let mut settings = if path.exists() {
        Settings::from_path(path)?
    } else {
        Settings::default()
    };
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Some(api_base) = std::env::var(TRANSLATION_API_BASE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        settings.translation.api_base = api_base.trim().to_string();
    }
}
