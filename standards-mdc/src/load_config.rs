//! `load_config` module: reads the optional YAML config file and applies environment overrides.
//!
//! This is the only place where user-supplied YAML is parsed into the core
//! [`Config`]. Every key in the file is optional; whatever is missing falls back
//! to the built-in defaults (the Drupal coding standards, written to
//! `.cursor/rules`).
//!
//! # Precedence
//! 1. `--output-dir` on the command line (applied by the CLI, not here)
//! 2. `STANDARDS_MDC_OUTPUT_DIR` environment variable
//! 3. the config file
//! 4. built-in defaults
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary.

use anyhow::Result;
use standards_mdc_core::config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Environment variable overriding `output.dir`.
pub const OUTPUT_DIR_ENV: &str = "STANDARDS_MDC_OUTPUT_DIR";

/// Loads the config file if one is given, otherwise the defaults, then applies env overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            info!("No config file given, using built-in defaults");
            Config::default()
        }
    };

    if let Some(dir) = std::env::var_os(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
        let dir = PathBuf::from(dir);
        info!(output_dir = %dir.display(), env = OUTPUT_DIR_ENV, "Output directory overridden from environment");
        config.output.dir = dir;
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    info!(config_path = ?path, "Loading configuration from file");

    let config_content = match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path,
                e
            ));
        }
    };

    if config_content.trim().is_empty() {
        info!(config_path = ?path, "Config file is empty, using built-in defaults");
        return Ok(Config::default());
    }

    match serde_yaml::from_str::<Config>(&config_content) {
        Ok(config) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}
