//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use trellis::{TrellisError, config::AppConfig};

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ConfigError> for TrellisError {
    fn from(err: ConfigError) -> Self {
        TrellisError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (trellis/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, TrellisError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("trellis/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "trellis", "trellis") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load configuration from a TOML file
///
/// # Errors
///
/// Returns error if the file is missing, unreadable or not valid TOML.
fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, TrellisError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: AppConfig =
        toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use trellis::{Format, Layout, engine::ProbePolicy};

    use super::*;

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [engines]
            order = ["layout-rs"]
            probe = "always-probe"
            total_memory = 33554432
            timeout_ms = 5000

            [render]
            format = "png"
            layout = "neato"
            "#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.engines().order(), ["layout-rs"]);
        assert_eq!(config.engines().probe(), ProbePolicy::AlwaysProbe);
        assert_eq!(config.engines().total_memory(), 33_554_432);
        assert_eq!(config.engines().timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.render().format(), Format::Png);
        assert_eq!(config.render().layout(), Layout::Neato);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[render]\nformat = \"dot\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.render().format(), Format::Dot);
        assert_eq!(config.engines().probe(), ProbePolicy::Sticky);
        assert_eq!(config.engines().total_memory(), 16 * 1024 * 1024);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_config(Some(dir.path().join("nope.toml"))).unwrap_err();

        assert!(matches!(err, TrellisError::Config(message) if message.contains("Missing")));
    }

    #[test]
    fn test_zero_total_memory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engines]\ntotal_memory = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();

        assert!(
            matches!(err, TrellisError::Config(message) if message.contains("greater than zero"))
        );
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engines]\nprobe = \"sometimes\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();

        assert!(matches!(err, TrellisError::Config(message) if message.contains("TOML")));
    }
}
