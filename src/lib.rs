//! Catalog Watch - new product monitor for a paginated shop catalog
//!
//! Scrapes every catalog page, compares the listing against the products
//! already notified, and sends one Telegram message per new product.

#![allow(clippy::uninlined_format_args)]

pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use crate::application::{CatalogScanner, LoopSettings, PollLoop, ScanPolicy};
use crate::domain::Notifier;
use crate::infrastructure::config::defaults;
use crate::infrastructure::{
    init_logging, log_system_info, AppConfig, ConfigError, ConfigManager, ConsoleNotifier, HttpClient,
    HttpClientConfig, JsonFileSeenStore, ProductListParser, TelegramConfig, TelegramNotifier,
};

/// Watch a product catalog and announce newly listed products
#[derive(Debug, Parser)]
#[command(name = "catalog-watch", version, about)]
pub struct Cli {
    /// Keep running and check on the configured interval
    #[arg(short, long)]
    pub bot: bool,

    /// Settings file
    #[arg(long, default_value = defaults::CONFIG_FILE)]
    pub config: PathBuf,

    /// State file, overriding `storage_file` from the settings
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Print new products instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

/// Entry point shared by the binary. Startup problems are reported and
/// mapped to a failing exit code; runtime cycle failures are logged.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let manager = ConfigManager::new(&cli.config);
    let mut config = match manager.read_config().await {
        Ok(config) => config,
        Err(e) => return Ok(report_config_error(&e)),
    };

    if cli.dry_run {
        config.notifications_enabled = false;
    }
    if let Some(state) = &cli.state {
        config.storage_file = state.clone();
    }
    if let Err(e) = config.validate() {
        return Ok(report_config_error(&e));
    }

    init_logging(&config.logging)?;
    log_system_info();

    let legacy_state = config.storage_file.with_file_name(defaults::LEGACY_STORAGE_FILE);
    let store = JsonFileSeenStore::load_with_fallback(&config.storage_file, &legacy_state)
        .with_context(|| format!("Cannot start with state file {:?}", config.storage_file))?;
    info!("📦 {} products already known", store.seen_set().len());

    let notifier = build_notifier(&config)?;
    let scanner = build_scanner(&config)?;
    let mut poll = PollLoop::new(scanner, store, notifier.clone(), LoopSettings::from_app_config(&config));

    if !cli.bot {
        info!("🔍 Running a single check");
        return Ok(match poll.run_once().await {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        });
    }

    let endpoint = notifier
        .check_connection()
        .await
        .map_err(|e| anyhow!("Notification channel check failed: {}", e))?;
    info!("✅ Notifications go to {}", endpoint);

    let announce = config.notifications_enabled && config.send_status_messages;
    if announce {
        let text = format!(
            "Catalog monitoring started. Checking {} every {}s.",
            config.catalog.catalog_url, config.check_interval_seconds
        );
        if let Err(e) = notifier.send_status(&text).await {
            warn!("⚠️ Could not send start message: {}", e);
        }
    }

    let checks = poll.run_forever(shutdown_signal()).await;
    info!("👋 Stopped after {} check(s)", checks);

    if announce {
        if let Err(e) = notifier.send_status("Catalog monitoring stopped.").await {
            warn!("⚠️ Could not send stop message: {}", e);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Logging is not up yet when the settings file fails, so this goes to stderr
fn report_config_error(error: &ConfigError) -> ExitCode {
    eprintln!("❌ {error}");
    if matches!(error, ConfigError::TemplateCreated { .. } | ConfigError::MissingKey(_)) {
        eprintln!("   Fill in telegram_bot_token and telegram_chat_id, or set notifications_enabled to false.");
    }
    ExitCode::from(2)
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    if config.notifications_enabled {
        info!("📨 Telegram notifications enabled");
        Ok(Arc::new(TelegramNotifier::new(TelegramConfig::from_app_config(config))?))
    } else {
        info!("🖥️ Notifications disabled, new products are printed to the console");
        Ok(Arc::new(ConsoleNotifier::new()))
    }
}

fn build_scanner(config: &AppConfig) -> Result<CatalogScanner> {
    let fetcher = HttpClient::with_config(HttpClientConfig::from_catalog_config(&config.catalog))?;
    let parser = ProductListParser::with_selectors(&config.catalog.selectors)
        .map_err(|e| anyhow!("Invalid catalog selectors: {}", e))?;
    Ok(CatalogScanner::new(
        Arc::new(fetcher),
        parser,
        ScanPolicy::from_catalog_config(&config.catalog),
    ))
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("❌ Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("❌ Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_line() {
        let cli = Cli::parse_from(["catalog-watch", "-b", "--state", "data/seen.json", "--dry-run"]);
        assert!(cli.bot);
        assert!(cli.dry_run);
        assert_eq!(cli.config, PathBuf::from("bot_config.json"));
        assert_eq!(cli.state, Some(PathBuf::from("data/seen.json")));
    }

    #[test]
    fn single_check_is_the_default_mode() {
        let cli = Cli::parse_from(["catalog-watch"]);
        assert!(!cli.bot);
        assert!(!cli.dry_run);
        assert!(cli.state.is_none());
    }

    #[tokio::test]
    async fn missing_settings_file_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bot_config.json");
        let cli = Cli {
            bot: false,
            config: config.clone(),
            state: None,
            dry_run: false,
        };

        let code = run(cli).await.unwrap();

        assert_eq!(code, ExitCode::from(2));
        assert!(config.exists());
    }
}
