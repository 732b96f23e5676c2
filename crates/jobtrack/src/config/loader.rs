use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the config, writing defaults when the file does not exist.
///
/// An unreadable or invalid file is logged and replaced by defaults in
/// memory; optional configuration never stops a run.
pub fn load_or_create_config<P: AsRef<Path>>(path: P) -> Config {
    let path = path.as_ref();
    if !path.exists() {
        let config = Config::default();
        match write_config(path, &config) {
            Ok(()) => info!("Created default config file: {}", path.display()),
            Err(e) => warn!("{}", e),
        }
        return config;
    }

    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {}", e);
            Config::default()
        }
    }
}

pub fn write_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, json).map_err(|e| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `~/.jobtrack/data/jobtrack.db`, or a relative path without a home dir.
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".jobtrack"))
        .unwrap_or_else(|| PathBuf::from(".jobtrack"))
        .join("data")
        .join("jobtrack.db")
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let identity = &config.identity;
    for (name, value) in [
        ("company_prefix_len", identity.company_prefix_len),
        ("position_prefix_len", identity.position_prefix_len),
        ("keyword_prefix_len", identity.keyword_prefix_len),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("identity.{} must be at least 1", name),
            });
        }
    }

    if !(4..=64).contains(&identity.hash_len) {
        return Err(ConfigError::Validation {
            message: format!(
                "identity.hash_len must be between 4 and 64, got {}",
                identity.hash_len
            ),
        });
    }

    if config.destination_name.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "destination_name must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "destination_name": "My Tracker",
            "fallback_csv_path": "/tmp/out.csv",
            "identity": { "hash_len": 12 },
            "keywords": { "status": { "ghosted": "Rejected" } }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.destination_name, "My Tracker");
        assert_eq!(config.identity.hash_len, 12);
        assert_eq!(config.identity.company_prefix_len, 10);
        assert_eq!(
            config.keywords.status.get("ghosted").map(String::as_str),
            Some("Rejected")
        );
    }

    #[test]
    fn test_unsupported_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_hash_len_bounds() {
        assert!(load_config_from_str(r#"{"identity": {"hash_len": 3}}"#).is_err());
        assert!(load_config_from_str(r#"{"identity": {"hash_len": 65}}"#).is_err());
        assert!(load_config_from_str(r#"{"identity": {"hash_len": 64}}"#).is_ok());
    }

    #[test]
    fn test_zero_prefix_rejected() {
        let result = load_config_from_str(r#"{"identity": {"position_prefix_len": 0}}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("jobtrack.json");

        let config = load_or_create_config(&path);
        assert_eq!(config.version, "1.0");
        assert!(path.exists());

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.destination_name, config.destination_name);
        assert_eq!(reloaded.keywords.status, config.keywords.status);
    }

    #[test]
    fn test_load_or_create_survives_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobtrack.json");
        std::fs::write(&path, "garbage").unwrap();

        let config = load_or_create_config(&path);
        assert_eq!(config.destination_name, "Job Applications Tracker");
        // invalid file is left untouched
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[test]
    fn test_database_path_override() {
        let config = load_config_from_str(r#"{"database_path": "/data/jt.db"}"#).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/data/jt.db"));
        assert!(Config::default()
            .database_path()
            .ends_with(".jobtrack/data/jobtrack.db"));
    }
}
