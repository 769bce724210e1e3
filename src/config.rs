//! Configuration file parser for ~/.config/newsfeed/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::content::extractor::DEFAULT_WEBSITE_PREFIX;
use crate::feed::{CatalogSettings, FeedRegistration, ReaderSettings};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Relative to the config directory when not absolute;
    /// `None` means `news.db` in the config directory.
    pub database_path: Option<String>,

    /// User-Agent sent with every request.
    pub user_agent: String,

    pub feed_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub page_timeout_secs: u64,

    /// Stored articles loaded when a feed run yields nothing.
    pub history_limit: i64,

    /// Feeds or pages fetched at the same time.
    pub fetch_concurrency: usize,

    /// Name prefix for websites created for arbitrary URLs.
    pub website_name_prefix: String,

    /// Feed and site registrations applied at startup.
    pub sources: Vec<FeedRegistration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            user_agent: format!("newsfeed/{}", env!("CARGO_PKG_VERSION")),
            feed_timeout_secs: 30,
            discovery_timeout_secs: 5,
            page_timeout_secs: 10,
            history_limit: 10,
            fetch_concurrency: 4,
            website_name_prefix: DEFAULT_WEBSITE_PREFIX.to_string(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "database_path",
        "user_agent",
        "feed_timeout_secs",
        "discovery_timeout_secs",
        "page_timeout_secs",
        "history_limit",
        "fetch_concurrency",
        "website_name_prefix",
        "sources",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            fetch_timeout: Duration::from_secs(self.feed_timeout_secs),
            history_limit: self.history_limit,
        }
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            validation_timeout: Duration::from_secs(self.feed_timeout_secs),
            discovery_timeout: Duration::from_secs(self.discovery_timeout_secs),
            reader: self.reader_settings(),
            fetch_concurrency: self.fetch_concurrency,
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.is_none());
        assert!(config.user_agent.starts_with("newsfeed/"));
        assert_eq!(config.feed_timeout_secs, 30);
        assert_eq!(config.discovery_timeout_secs, 5);
        assert_eq!(config.page_timeout_secs, 10);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.fetch_concurrency, 4);
        assert_eq!(config.website_name_prefix, "Website");
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/newsfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn test_whitespace_only_returns_default() {
        let config = Config::parse("   \n  \n  ").unwrap();
        assert_eq!(config.fetch_concurrency, 4);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::parse("page_timeout_secs = 3\n").unwrap();
        assert_eq!(config.page_timeout(), Duration::from_secs(3));
        assert_eq!(config.feed_timeout_secs, 30);
    }

    #[test]
    fn test_sources_table_array() {
        let content = r#"
database_path = "/var/lib/newsfeed/news.db"
history_limit = 5
website_name_prefix = "Scraped"

[[sources]]
name = "Daily"
feed_url = "https://daily.example/rss"
leaning = "left"

[[sources]]
name = "Weekly"
site_url = "https://weekly.example"
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.database_path.as_deref(), Some("/var/lib/newsfeed/news.db"));
        assert_eq!(config.website_name_prefix, "Scraped");
        assert_eq!(config.reader_settings().history_limit, 5);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(
            config.sources[0],
            FeedRegistration {
                leaning: Some("left".to_string()),
                ..FeedRegistration::feed("Daily", "https://daily.example/rss")
            }
        );
        assert_eq!(config.sources[1].feed_url, None);
        assert_eq!(config.sources[1].site_url.as_deref(), Some("https://weekly.example"));
    }

    #[test]
    fn test_catalog_settings_from_config() {
        let config = Config::parse("discovery_timeout_secs = 2\nfetch_concurrency = 8\n").unwrap();
        let settings = config.catalog_settings();
        assert_eq!(settings.discovery_timeout, Duration::from_secs(2));
        assert_eq!(settings.validation_timeout, Duration::from_secs(30));
        assert_eq!(settings.fetch_concurrency, 8);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("history_limit = 3\ntotally_fake_key = 1\n").unwrap();
        assert_eq!(config.history_limit, 3);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::parse("history_limit = \"ten\"\n").is_err());
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("newsfeed_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_reads_file() {
        let dir = std::env::temp_dir().join("newsfeed_config_test_load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "user_agent = \"test-agent\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.user_agent, "test-agent");

        std::fs::remove_dir_all(&dir).ok();
    }
}
