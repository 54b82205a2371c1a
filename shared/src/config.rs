//! Configuration persistence utilities
//!
//! Loads and saves the sign configuration as TOML in the per-user config
//! directory, or at an explicit path.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;

use crate::channel::MAX_PAYLOAD_TIMEOUT;
use crate::mode::Mode;
use crate::time_engine::{parse_timezone, system_timezone};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to determine config directory
    NoConfigDir,
    /// IO error while reading/writing config
    Io(io::Error),
    /// Failed to parse config file
    Parse(toml::de::Error),
    /// Failed to serialize config
    Serialize(toml::ser::Error),
    /// A field holds a value the sign cannot use
    Invalid { field: &'static str, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Could not determine config directory"),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
            ConfigError::Invalid { field, message } => write!(f, "Invalid {}: {}", field, message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// Persisted sign settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignConfig {
    /// Command channel listen address
    pub bind_addr: SocketAddr,
    /// IANA timezone for wall-clock rendering
    pub timezone: String,
    /// Command token of the mode shown when startup times out
    pub default_mode: String,
    pub startup_delay_secs: u64,
    pub tick_ms: u64,
    /// How long a text update waits for its payload
    pub payload_timeout_secs: u64,
    pub info_text: String,
    pub warning_text: String,
    /// Port of the operator console, shown on the startup screen
    pub web_port: u16,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5555)),
            timezone: system_timezone()
                .map(|tz| tz.name().to_string())
                .unwrap_or_else(|| "UTC".to_string()),
            default_mode: "time".to_string(),
            startup_delay_secs: 60,
            tick_ms: 100,
            payload_timeout_secs: 5,
            info_text: "Infotext".to_string(),
            warning_text: "Varningstext".to_string(),
            web_port: 5000,
        }
    }
}

impl SignConfig {
    pub fn default_mode(&self) -> Result<Mode, ConfigError> {
        Mode::from_token(&self.default_mode).ok_or_else(|| ConfigError::Invalid {
            field: "default_mode",
            message: format!("'{}' is not a mode command", self.default_mode),
        })
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone(&self.timezone).map_err(|message| ConfigError::Invalid {
            field: "timezone",
            message,
        })
    }

    pub fn tick_period(&self) -> Result<Duration, ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(Duration::from_millis(self.tick_ms))
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn payload_timeout(&self) -> Duration {
        Duration::from_secs(self.payload_timeout_secs)
    }

    /// Check every field that has to parse into something richer
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_mode()?;
        self.timezone()?;
        self.tick_period()?;
        if self.payload_timeout() > MAX_PAYLOAD_TIMEOUT {
            return Err(ConfigError::Invalid {
                field: "payload_timeout_secs",
                message: format!("must be at most {} seconds", MAX_PAYLOAD_TIMEOUT.as_secs()),
            });
        }
        Ok(())
    }
}

/// Get the base configuration directory for the sign
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "mx-sign", "mxdisplay").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the configuration file path for a named display
pub fn config_path(display_name: &str) -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(format!("{}.toml", display_name)))
}

/// Load configuration from `path`
///
/// Returns `None` if the file doesn't exist yet.
/// Returns an error if the file exists but can't be parsed.
pub fn load_config_from<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let config: T = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Save configuration to `path`
pub fn save_config_to<T: Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load the sign configuration, writing defaults on first run
pub fn load_or_init(path: &Path) -> Result<SignConfig, ConfigError> {
    let config = match load_config_from::<SignConfig>(path)? {
        Some(config) => config,
        None => {
            let config = SignConfig::default();
            save_config_to(path, &config)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
            config
        }
    };
    config.validate()?;
    Ok(config)
}
