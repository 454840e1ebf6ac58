pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings, TRANSLATION_API_BASE_ENV};
pub use paths::{
    default_global_config_path, resolve_config_path, CONFIG_PATH_ENV, GLOBAL_SETTINGS_FILE_NAME,
    GLOBAL_STATE_DIR,
};
pub use settings::{
    BridgeSettings, EngineSettings, LoggingSettings, Settings, TranslationSettings,
    DEFAULT_TRANSLATION_API_BASE, DEFAULT_TRANSLATION_MODEL,
};
