use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.json";
pub const HOME_ENV: &str = "REGROUP_HOME";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: "regroup.db".to_string(),
            log_filter: "regroup=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults for `data_dir`, overlaid with `config.json` from that
    /// directory when present.
    pub fn load(data_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.map(Path::to_path_buf).unwrap_or_else(default_data_dir);
        let path = data_dir.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            AppConfig::default()
        };

        // The directory the file was found in wins over whatever it says.
        config.data_dir = data_dir;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// `$REGROUP_HOME`, else `<Documents>/Regroup`, else `<home>/Regroup`.
pub fn default_data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Regroup")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = AppConfig::load(Some(temp_dir.path())).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.database_file, "regroup.db");
        assert_eq!(config.database_path(), temp_dir.path().join("regroup.db"));
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            r#"{"database_file": "other.db", "data_dir": "/ignored"}"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(temp_dir.path())).unwrap();
        assert_eq!(config.database_file, "other.db");
        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.log_filter, AppConfig::default().log_filter);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "database_file = 3").unwrap();

        let err = AppConfig::load(Some(temp_dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
