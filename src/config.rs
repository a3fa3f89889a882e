// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for assembling the runtime
//! configuration from a TOML file and environment overrides.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_PATH_VAR: &str = "GATEWAY_CONFIG";

/// Load configuration for the serverless environment.
///
/// Reads the file named by `GATEWAY_CONFIG` when set, otherwise starts from
/// defaults, then applies environment overrides and validates.
pub fn load_runtime_config() -> Result<Config> {
    let mut config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            log::info!("Loading config file: {}", path);
            Config::load(&path).map_err(|e| {
                AppError::config(format!("Failed to load config from {path}: {e}"))
            })?
        }
        _ => Config::default(),
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file for local use.
///
/// Falls back to defaults if the file cannot be read, then applies
/// environment overrides and validates.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        log::warn!(
            "Config file {} not found. Using default configuration.",
            path.display()
        );
        Config::default()
    };

    config.apply_env();
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("gateway.toml")).unwrap();
        assert!(!config.crawler.user_agent.is_empty());
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[crawler]\ntimeout_secs = 0").unwrap();
        let result = load_config(file.path());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_load_config_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[crawler\ntimeout_secs = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(AppError::Toml(_))));
    }
}
