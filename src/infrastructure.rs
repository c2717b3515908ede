//! Infrastructure layer: HTTP, HTML parsing, persistence and messaging
//!
//! Concrete implementations of the domain service traits plus the settings
//! file and logging setup.

pub mod config;
pub mod console_notifier;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod seen_store;
pub mod telegram_notifier;

pub use config::{AppConfig, CatalogConfig, ConfigError, ConfigManager, LoggingConfig};
pub use console_notifier::ConsoleNotifier;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{init_logging, log_system_info};
pub use parsing::{ParseContext, ParseError, ProductListParser, ProductListSelectors};
pub use seen_store::JsonFileSeenStore;
pub use telegram_notifier::{TelegramConfig, TelegramNotifier};
