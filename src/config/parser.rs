//! Configuration file loading
//!
//! Loads and validates the TOML application config. The SHA-256 hash of the
//! raw file is logged at startup so operators can tell which configuration a
//! long-running process was started with.

use crate::config::{validate_app_config, AppConfig};
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads the application configuration from a TOML file
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Returns
///
/// * `Ok(AppConfig)` - Parsed and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse or validate
pub fn load_config(path: &Path) -> ConfigResult<AppConfig> {
    let (config, _hash) = load_config_with_hash(path)?;
    Ok(config)
}

/// Loads the application configuration and its content hash
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Returns
///
/// * `Ok((AppConfig, String))` - Configuration and hex-encoded SHA-256 hash
/// * `Err(ConfigError)` - Failed to read, parse or validate
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(AppConfig, String)> {
    let content = std::fs::read_to_string(path)?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = hex::encode(hasher.finalize());

    let config: AppConfig = toml::from_str(&content)?;
    validate_app_config(&config)?;

    Ok((config, hash))
}
