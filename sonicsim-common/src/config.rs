//! Configuration file helpers and data folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for config and data directories
pub const APP_NAME: &str = "sonicsim";

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "SONICSIM_DATA_DIR";

/// File name of the fingerprint database inside the data folder
pub const DATABASE_FILE_NAME: &str = "sonicsim.db";

/// Data folder resolution, highest priority first:
/// 1. Explicit argument from the host application
/// 2. Environment variable
/// 3. `data_folder` key of the TOML config file
/// 4. OS-dependent default
pub fn resolve_data_folder(
    explicit: Option<&Path>,
    env_var_name: &str,
    config_file: Option<&Path>,
) -> PathBuf {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "Data folder from host argument");
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            debug!(path = %path, env = env_var_name, "Data folder from environment");
            return PathBuf::from(path);
        }
    }

    if let Some(config_path) = config_file {
        if let Ok(content) = std::fs::read_to_string(config_path) {
            if let Ok(value) = toml::from_str::<toml::Value>(&content) {
                if let Some(folder) = value.get("data_folder").and_then(|v| v.as_str()) {
                    debug!(path = %folder, "Data folder from TOML config");
                    return PathBuf::from(folder);
                }
            }
        }
    }

    default_data_folder()
}

/// OS-dependent default data folder
///
/// Linux: `~/.local/share/sonicsim`, macOS: `~/Library/Application Support/sonicsim`,
/// Windows: `%LOCALAPPDATA%\sonicsim`.
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("./sonicsim_data"))
}

/// Platform config file location (`<config_dir>/sonicsim/sonicsim.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
}

/// Read and deserialize a TOML file
pub fn read_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Serialize and write a TOML file atomically (temp file + rename)
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
