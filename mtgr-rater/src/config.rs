//! Runtime configuration for mtgr-rater
//!
//! Resolved from the TOML file with command-line values taking priority.

use mtgr_common::config::{RootFolderResolver, TomlConfig, STORAGE_FILE_NAME};
use mtgr_common::time::millis_to_duration;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Values given on the command line; `None` keeps the TOML value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_folder: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub scryfall_url: Option<String>,
    pub language: Option<String>,
    pub apply_set_order: bool,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaterConfig {
    pub root_folder: PathBuf,
    pub backend_url: String,
    pub scryfall_url: String,
    pub language: String,
    pub preview_delay: Duration,
    pub page_interval: Duration,
    pub prefetch_cache_size: usize,
    pub apply_set_order: bool,
    pub disabled_formats: Vec<String>,
}

impl RaterConfig {
    pub fn resolve(toml: &TomlConfig, overrides: Overrides) -> Self {
        let root_folder =
            RootFolderResolver::new(overrides.root_folder, toml.root_folder.clone()).resolve();

        let config = Self {
            root_folder,
            backend_url: overrides
                .backend_url
                .unwrap_or_else(|| toml.backend_url.clone()),
            scryfall_url: overrides
                .scryfall_url
                .unwrap_or_else(|| toml.scryfall_url.clone()),
            language: overrides.language.unwrap_or_else(|| toml.language.clone()),
            preview_delay: millis_to_duration(toml.preview_delay_ms),
            page_interval: millis_to_duration(toml.page_interval_ms),
            prefetch_cache_size: toml.prefetch_cache_size,
            apply_set_order: overrides.apply_set_order || toml.apply_set_order,
            disabled_formats: toml.disabled_formats.clone(),
        };

        info!(
            root_folder = %config.root_folder.display(),
            backend = %config.backend_url,
            language = %config.language,
            "Resolved configuration"
        );

        config
    }

    /// Local rating cache file
    pub fn storage_path(&self) -> PathBuf {
        self.root_folder.join(STORAGE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let toml = TomlConfig::parse(
            r#"
            backend_url = "https://ratings.example"
            language = "ja"
            preview_delay_ms = 150
            "#,
        )
        .unwrap();

        let config = RaterConfig::resolve(
            &toml,
            Overrides {
                root_folder: Some(PathBuf::from("/tmp/mtgr-test")),
                language: Some("de".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(config.backend_url, "https://ratings.example");
        assert_eq!(config.language, "de");
        assert_eq!(config.preview_delay, Duration::from_millis(150));
        assert_eq!(
            config.storage_path(),
            PathBuf::from("/tmp/mtgr-test").join(STORAGE_FILE_NAME)
        );
    }
}
