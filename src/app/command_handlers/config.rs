use crate::app::command_support::{config_path, load_settings, map_config_err};

pub fn cmd_config() -> Result<String, String> {
    let path = config_path()?;
    let settings = load_settings()?;
    let yaml = settings.to_yaml().map_err(map_config_err)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (missing, showing defaults)", path.display())
    };
    Ok(format!("# source: {source}\n{}", yaml.trim_end()))
}
