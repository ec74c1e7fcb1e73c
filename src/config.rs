//! Configuration handling for OpenVPN askpass

use crate::dialog::DialogOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Config file looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "openvpn-askpass.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("dialog.command must name a program")]
    EmptyDialogCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unix socket OpenVPN connects to
    pub socket: PathBuf,
    pub dialog: DialogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Dialog program followed by any leading arguments
    pub command: Vec<String>,
    /// Appearance of the credential prompt
    pub prompt: DialogOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: PathBuf::from("askpass.sock"),
            dialog: DialogConfig::default(),
        }
    }
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            command: vec!["zenity".to_string()],
            prompt: DialogOptions::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the config from `explicit`, or from the default locations
    ///
    /// Lookup order: `./openvpn-askpass.toml`, then
    /// `<config dir>/openvpn-askpass/config.toml`. Built-in defaults are used
    /// when neither exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidates = [Some(PathBuf::from(LOCAL_CONFIG_FILE)), user_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                debug!("Loading config from {}", path.display());
                return Self::load(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dialog.command.first().is_none_or(|program| program.is_empty()) {
            return Err(ConfigError::EmptyDialogCommand);
        }
        Ok(())
    }
}

/// Per-user config file location
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("openvpn-askpass").join("config.toml"))
}
