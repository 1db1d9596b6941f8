//! Configuration management for checkin.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::export::parse_hex_color;
use crate::store::DEFAULT_EVENT_NAME;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "checkin";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "checkin.db";

/// Upper bound for the configurable party size limit.
const PARTY_SIZE_CEILING: u32 = 1_000;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CHECKIN_`, sections separated
///    by a double underscore, e.g. `CHECKIN_CHECKIN__MAX_PARTY_SIZE`)
/// 2. TOML config file at `~/.config/checkin/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Event configuration.
    pub event: EventConfig,
    /// Check-in flow configuration.
    pub checkin: CheckInConfig,
    /// QR export configuration.
    pub export: ExportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/checkin/checkin.db`
    pub database_path: Option<PathBuf>,
}

/// Event-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Event name shown until one is set with `checkin event rename`.
    pub default_name: String,
}

/// Check-in flow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckInConfig {
    /// Largest party size the prompt accepts.
    pub max_party_size: u32,
    /// Party size the prompt starts at.
    pub default_party_size: u32,
}

/// QR export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Minimum width and height of each QR image in pixels.
    pub image_size: u32,
    /// Surround the code with the standard quiet zone.
    pub quiet_zone: bool,
    /// Module color, `#rrggbb`.
    pub dark_color: String,
    /// Background color, `#rrggbb`.
    pub light_color: String,
    /// Archive file name used when no output path is given.
    pub archive_name: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_EVENT_NAME.to_string(),
        }
    }
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            max_party_size: 20,
            default_party_size: 1,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            image_size: 400,
            quiet_zone: true,
            dark_color: "#1a1a1a".to_string(),
            light_color: "#ffffff".to_string(),
            archive_name: "guest-qr-codes.zip".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("CHECKIN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let checkin = &self.checkin;
        if checkin.max_party_size == 0 || checkin.max_party_size > PARTY_SIZE_CEILING {
            return Err(invalid(format!(
                "max_party_size must be between 1 and {PARTY_SIZE_CEILING}, got {}",
                checkin.max_party_size
            )));
        }

        if checkin.default_party_size == 0 || checkin.default_party_size > checkin.max_party_size
        {
            return Err(invalid(format!(
                "default_party_size ({}) must be between 1 and max_party_size ({})",
                checkin.default_party_size, checkin.max_party_size
            )));
        }

        if self.event.default_name.trim().is_empty() {
            return Err(invalid("event.default_name cannot be empty"));
        }

        if self.export.image_size == 0 {
            return Err(invalid("image_size must be greater than 0"));
        }

        for (field, value) in [
            ("dark_color", &self.export.dark_color),
            ("light_color", &self.export.light_color),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(invalid(format!(
                    "{field} must be a #rrggbb color, got {value:?}"
                )));
            }
        }

        if self.export.archive_name.trim().is_empty() {
            return Err(invalid("archive_name cannot be empty"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
