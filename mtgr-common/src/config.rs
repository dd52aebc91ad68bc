//! Configuration loading and root folder resolution
//!
//! Missing configuration never stops startup: a missing TOML file logs a
//! warning and compiled defaults are used. A file that exists but does not
//! parse is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the data folder
pub const ROOT_FOLDER_ENV: &str = "MTGR_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "MTGR_CONFIG";

/// Default ratings backend
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";

/// Default card-metadata API
pub const DEFAULT_SCRYFALL_URL: &str = "https://api.scryfall.com";

/// Default hover-preview debounce
pub const DEFAULT_PREVIEW_DELAY_MS: u64 = 200;

/// Default spacing between card API page requests
pub const DEFAULT_PAGE_INTERVAL_MS: u64 = 100;

/// Default number of prefetched images kept in memory
pub const DEFAULT_PREFETCH_CACHE_SIZE: usize = 32;

/// Local rating cache file name inside the root folder
pub const STORAGE_FILE_NAME: &str = "local_ratings.json";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `config.toml`
///
/// Every field is optional in the file; absent fields take the compiled
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Data folder holding the local rating cache
    pub root_folder: Option<PathBuf>,
    /// Ratings backend base URL
    pub backend_url: String,
    /// Card-metadata API base URL
    pub scryfall_url: String,
    /// Language for localized card art ("en", "ja", ...)
    pub language: String,
    /// Hover-preview debounce in milliseconds
    pub preview_delay_ms: u64,
    /// Minimum spacing between card API page requests in milliseconds
    pub page_interval_ms: u64,
    /// Number of prefetched images kept in memory
    pub prefetch_cache_size: usize,
    /// Reorder catalogs by the collection's explicit set order
    pub apply_set_order: bool,
    /// Formats hidden from rating and export
    pub disabled_formats: Vec<String>,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            scryfall_url: DEFAULT_SCRYFALL_URL.to_string(),
            language: "en".to_string(),
            preview_delay_ms: DEFAULT_PREVIEW_DELAY_MS,
            page_interval_ms: DEFAULT_PAGE_INTERVAL_MS,
            prefetch_cache_size: DEFAULT_PREFETCH_CACHE_SIZE,
            apply_set_order: false,
            disabled_formats: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load `path`, or the default location when `None`
    ///
    /// A missing file yields the compiled defaults with a warning.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let config = Self::load(&path)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Default config file: `$MTGR_CONFIG`, else `<config dir>/mtgr/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("mtgr").join("config.toml"))
}

/// OS-dependent default data folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mtgr"))
        .unwrap_or_else(|| PathBuf::from("./mtgr_data"))
}

/// Data folder resolution in priority order:
/// 1. Command-line argument
/// 2. `MTGR_ROOT_FOLDER` environment variable
/// 3. `root_folder` in the TOML config
/// 4. OS-dependent default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self {
            cli_arg,
            toml_value,
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.toml_value {
            return path.clone();
        }
        default_root_folder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.preview_delay_ms, DEFAULT_PREVIEW_DELAY_MS);
        assert_eq!(config.language, "en");
        assert!(!config.apply_set_order);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = TomlConfig::parse(
            r#"
            backend_url = "https://ratings.example"
            disabled_formats = ["cube"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_url, "https://ratings.example");
        assert_eq!(config.disabled_formats, vec!["cube".to_string()]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scryfall_url, DEFAULT_SCRYFALL_URL);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let result = TomlConfig::parse("preview_delay_ms = \"soon\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
