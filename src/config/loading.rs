//! Configuration loading functionality.
//!
//! Handles locating the configuration file, creating a default one when
//! missing, and applying defaults after parsing.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::common::constants::*;
use crate::common::utils::private_path;

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for the current process.
/// This can only be called once, typically at startup.
/// Returns an error if already set.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// Get the configuration file path.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = CONFIG_DIR.get().and_then(|d| d.clone()) {
        return Ok(custom_dir.join("sunwidgetr.toml"));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("sunwidgetr").join("sunwidgetr.toml"))
}

/// Load configuration using automatic path detection.
///
/// This function will create a default configuration file if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load configuration from a specific path.
///
/// This version does NOT create a default config if the path doesn't exist.
pub fn load_from_path(path: &PathBuf) -> Result<Config> {
    if !path.exists() {
        log_pipe!();
        log_error!("Configuration file not found at specified path:");
        log_indented!("{}", private_path(path));
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    validate_config(&config)?;

    apply_defaults(&mut config);

    Ok(config)
}

/// Apply default values to configuration fields.
fn apply_defaults(config: &mut Config) {
    if config.endpoint.is_none() {
        config.endpoint = Some(DEFAULT_ENDPOINT.to_string());
    }
    if config.fetch_timeout_secs.is_none() {
        config.fetch_timeout_secs = Some(DEFAULT_FETCH_TIMEOUT_SECS);
    }
    if config.accuracy_threshold.is_none() {
        config.accuracy_threshold = Some(DEFAULT_ACCURACY_THRESHOLD);
    }
    if config.accuracy_preference.is_none() {
        config.accuracy_preference = Some(Default::default());
    }
}
