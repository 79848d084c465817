//! Configuration file loading and setting resolution
//!
//! Settings resolve in this priority order:
//! 1. Command-line argument or environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! A missing default config file is not an error: the module starts with
//! compiled defaults. An explicitly requested file must exist and parse.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{Error, Result};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "vibra";

/// Default config file path for a module (e.g. `~/.config/vibra/vibra-proxy.toml`)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(format!("{}.toml", module_name)))
}

/// Load a module's TOML configuration.
///
/// With `explicit_path` the file must exist. Without it, the platform
/// default path is tried and compiled defaults are used when it is absent.
pub fn load_toml_config<T>(explicit_path: Option<&Path>, module_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!("Config file not found: {}", path.display())));
            }
            path.to_path_buf()
        }
        None => match default_config_path(module_name) {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file for {}, using compiled defaults", module_name);
                return Ok(T::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Pick the first configured value: override, then file, then default
pub fn resolve_setting<T>(override_value: Option<T>, file_value: Option<T>, default: T) -> T {
    override_value.or(file_value).unwrap_or(default)
}

/// Read an environment variable, treating blank values as unset
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
