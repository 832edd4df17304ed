use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EcoError;

/// Service configuration, read from a TOML file with environment-variable
/// overrides layered on top. Every field has a default, so both the file
/// and any individual key may be absent.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the curve CSV files and the species table.
    pub data_dir: PathBuf,
    /// SQLite database with instance, tree, region and override data.
    pub database: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database: PathBuf::from("eco.db"),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Read a config file, then apply `ECO_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EcoError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn from_toml(text: &str) -> Result<Self, EcoError> {
        toml::from_str(text).map_err(|e| EcoError::DataLoad(format!("invalid config: {e}")))
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ECO_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ECO_DATABASE") {
            self.database = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ECO_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("ECO_PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
    }
}
