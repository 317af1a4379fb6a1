//! Server configuration
//!
//! TOML file with three sections:
//!
//! ```toml
//! [server]
//! log_level = "info"
//! log_format = "text"
//!
//! [mailbox]
//! data_dir = "/var/lib/sapphire-duck"
//!
//! [[accounts]]
//! address = "me@example.com"
//! display_name = "Me"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// File name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub mailbox: MailboxConfig,
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Default tracing directive; `RUST_LOG` wins when set
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Mailbox directory; the platform data directory when unset
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub address: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load from `explicit` (from `--config` or `SAPPHIRE_DUCK_CONFIG`), else
    /// from the platform config directory. Only an explicit file has to exist.
    ///
    /// Runs before logging is configured, so where the config came from is
    /// returned for the caller to report.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        Self::load_from(explicit, default_config_path())
    }

    fn load_from(
        explicit: Option<&Path>,
        default_path: Option<PathBuf>,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
        }

        match default_path {
            Some(path) if path.is_file() => {
                let config = Self::from_file(&path)?;
                Ok((config, ConfigSource::Default(path)))
            }
            Some(path) => Ok((Self::default(), ConfigSource::Missing(path))),
            None => Ok((Self::default(), ConfigSource::Unavailable)),
        }
    }

    /// Mailbox directory: `override_dir` (command line / environment) beats
    /// the config file
    pub fn data_dir(&self, override_dir: Option<PathBuf>) -> Option<PathBuf> {
        override_dir.or_else(|| self.mailbox.data_dir.clone())
    }
}

/// Where [`Config::load`] found its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` or `SAPPHIRE_DUCK_CONFIG`
    Explicit(PathBuf),
    /// File in the platform config directory
    Default(PathBuf),
    /// Nothing at the default location; defaults in use
    Missing(PathBuf),
    /// No platform config directory; defaults in use
    Unavailable,
}

impl ConfigSource {
    /// Log the outcome. Call once the subscriber is installed.
    pub fn log(&self) {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Default(path) => {
                info!("Loaded config from {}", path.display())
            }
            ConfigSource::Missing(path) => {
                warn!("No config file at {}, using defaults", path.display())
            }
            ConfigSource::Unavailable => {
                warn!("Could not determine config directory, using defaults")
            }
        }
    }
}

/// `<platform config dir>/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "sapphire-duck", "sapphire-duck")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
