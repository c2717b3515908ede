//! Configuration infrastructure
//!
//! Loads the operator's JSON settings file. Only the messaging credentials
//! are mandatory; everything else falls back to the values in [`defaults`].
//!
//! A missing file is replaced by a template and reported as an error so the
//! operator can fill in the credentials before the first real run.

#![allow(clippy::uninlined_format_args)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::infrastructure::parsing::config::ProductListSelectors;

/// Placeholder written into the template for the bot token
pub const TOKEN_PLACEHOLDER: &str = "YOUR_BOT_TOKEN_HERE";

/// Placeholder written into the template for the chat id
pub const CHAT_ID_PLACEHOLDER: &str = "YOUR_CHAT_ID_HERE";

/// Startup configuration failures. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file {path} not found; a template was written, fill in your Telegram credentials and run again")]
    TemplateCreated { path: PathBuf },

    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("please set `{0}` in the configuration file")]
    MissingKey(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bot token issued by @BotFather
    pub telegram_bot_token: String,

    /// Destination chat for notifications
    pub telegram_chat_id: String,

    /// Seconds between two polling cycles
    pub check_interval_seconds: u64,

    /// When false, new products are only printed to the console
    pub notifications_enabled: bool,

    /// Send "bot started"/"bot stopped" messages in continuous mode
    pub send_status_messages: bool,

    /// Pause between two consecutive product notifications
    pub notify_delay_ms: u64,

    /// Telegram Bot API endpoint
    pub telegram_api_base: String,

    /// Path of the seen-products state file, relative to the working directory
    pub storage_file: PathBuf,

    /// Catalog source settings
    pub catalog: CatalogConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Catalog source and pagination settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// First catalog page
    pub catalog_url: String,

    /// URL of page n > 1. `{base}` is the catalog URL without a trailing slash,
    /// `{page}` the 1-based page index.
    pub page_url_template: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Hard ceiling on the number of pages visited per scan
    pub max_pages: u32,

    /// Attempts per page, first try included
    pub max_fetch_attempts: u32,

    /// Base backoff between attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,

    /// User agent string
    pub user_agent: String,

    /// CSS anchors of the list page
    pub selectors: ProductListSelectors,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for the log file, relative to the working directory
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
            check_interval_seconds: defaults::CHECK_INTERVAL_SECONDS,
            notifications_enabled: true,
            send_status_messages: true,
            notify_delay_ms: defaults::NOTIFY_DELAY_MS,
            telegram_api_base: defaults::TELEGRAM_API_BASE.to_string(),
            storage_file: PathBuf::from(defaults::STORAGE_FILE),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_url: defaults::CATALOG_URL.to_string(),
            page_url_template: defaults::PAGE_URL_TEMPLATE.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_pages: defaults::MAX_PAGES,
            max_fetch_attempts: defaults::MAX_FETCH_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            user_agent: defaults::USER_AGENT.to_string(),
            selectors: ProductListSelectors::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from(defaults::LOG_DIR),
        }
    }
}

impl AppConfig {
    /// Configuration written on first run
    pub fn template() -> Self {
        Self {
            telegram_bot_token: TOKEN_PLACEHOLDER.to_string(),
            telegram_chat_id: CHAT_ID_PLACEHOLDER.to_string(),
            ..Self::default()
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }

    /// Check required keys and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notifications_enabled {
            if is_unset(&self.telegram_bot_token, TOKEN_PLACEHOLDER) {
                return Err(ConfigError::MissingKey("telegram_bot_token"));
            }
            if is_unset(&self.telegram_chat_id, CHAT_ID_PLACEHOLDER) {
                return Err(ConfigError::MissingKey("telegram_chat_id"));
            }
        }

        if self.check_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "check_interval_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }

        self.catalog.validate()
    }
}

impl CatalogConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.catalog_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    key: "catalog.catalog_url",
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    key: "catalog.catalog_url",
                    reason: e.to_string(),
                });
            }
        }

        if !self.page_url_template.contains("{page}") {
            return Err(ConfigError::Invalid {
                key: "catalog.page_url_template",
                reason: "must contain the {page} placeholder".to_string(),
            });
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "catalog.request_timeout_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.max_pages == 0 {
            return Err(ConfigError::Invalid {
                key: "catalog.max_pages",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.max_fetch_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "catalog.max_fetch_attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn is_unset(value: &str, placeholder: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == placeholder
}

/// Configuration manager for loading the settings file
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load and validate the configuration.
    ///
    /// A missing file is replaced by [`AppConfig::template`] and reported as
    /// [`ConfigError::TemplateCreated`].
    pub async fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let config = self.read_config().await?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file without validating it, for callers that apply
    /// command-line overrides first
    pub async fn read_config(&self) -> Result<AppConfig, ConfigError> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            info!("Configuration file not found, writing template: {:?}", self.config_path);
            self.save_config(&AppConfig::template()).await?;
            return Err(ConfigError::TemplateCreated {
                path: self.config_path.clone(),
            });
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|source| ConfigError::Read {
                path: self.config_path.clone(),
                source,
            })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: self.config_path.clone(),
            source,
        })?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| ConfigError::Write {
                path: self.config_path.clone(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Malformed {
            path: self.config_path.clone(),
            source,
        })?;

        fs::write(&self.config_path, content)
            .await
            .map_err(|source| ConfigError::Write {
                path: self.config_path.clone(),
                source,
            })?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    /// First page of the "recent products" catalog
    pub const CATALOG_URL: &str = "https://bsgmag.ro/catalog/produse-recente";

    /// Pages 2+ append `/p{n}` to the catalog path
    pub const PAGE_URL_TEMPLATE: &str = "{base}/p{page}";

    /// Default seconds between checks
    pub const CHECK_INTERVAL_SECONDS: u64 = 300;

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

    /// Safety ceiling against runaway pagination
    pub const MAX_PAGES: u32 = 200;

    /// Attempts per page, first try included
    pub const MAX_FETCH_ATTEMPTS: u32 = 3;

    /// Base retry backoff in milliseconds
    pub const RETRY_DELAY_MS: u64 = 1000;

    /// Pause between two notifications
    pub const NOTIFY_DELAY_MS: u64 = 500;

    /// Attempts at writing the state file per cycle
    pub const PERSIST_ATTEMPTS: u32 = 3;

    pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

    pub const STORAGE_FILE: &str = "seen_products.json";

    /// State file name used by earlier installs, read once when `STORAGE_FILE` is missing
    pub const LEGACY_STORAGE_FILE: &str = "bsg_products.json";

    pub const CONFIG_FILE: &str = "bot_config.json";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    pub const LOG_DIR: &str = "logs";

    pub const LOG_FILE_NAME: &str = "catalog-watch.log";
}

/// URL building helper functions
pub mod utils {
    /// Build the URL of a 1-based catalog page.
    ///
    /// Page 1 (and 0, treated the same) is the catalog URL itself.
    pub fn catalog_page_url(catalog_url: &str, page_url_template: &str, page: u32) -> String {
        if page <= 1 {
            return catalog_url.to_string();
        }
        page_url_template
            .replace("{base}", catalog_url.trim_end_matches('/'))
            .replace("{page}", &page.to_string())
    }
}
