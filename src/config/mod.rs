mod schema;
mod validation;

pub use schema::{Config, ContestConfig, FetchConfig};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory, then in the config directory.
pub const CONFIG_FILE_NAME: &str = "contest.yaml";

/// Get the config directory path (~/.config/wscontest/)
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("wscontest"))
}

/// Pick the config file: the explicit path if given, else `./contest.yaml`,
/// else `~/.config/wscontest/contest.yaml`.
pub fn resolve_config_path(path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = path {
        return path;
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    get_config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}

/// Load configuration from a YAML file
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = resolve_config_path(path);
    load_config_file(&config_path)
}

fn load_config_file(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Create ./{} or pass --config",
            config_path.display(),
            CONFIG_FILE_NAME
        );
    }

    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}
