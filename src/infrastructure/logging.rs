//! Logging system configuration and initialization
//!
//! - Console output with local timestamps
//! - Optional plain-text log file (rotated by renaming on startup)
//! - Level from the settings file, overridable with `RUST_LOG`

#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::defaults::LOG_FILE_NAME;

// Keeps the non-blocking file writer alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Local wall-clock timestamps
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Filter built from `RUST_LOG`, or from the configured level with noisy
/// HTTP internals held back unless tracing everything.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(level).map_err(|e| anyhow!("Invalid log level {:?}: {}", level, e))?;
    if !level.to_lowercase().contains("trace") {
        for directive in ["reqwest=warn", "hyper=warn", "hyper_util=warn", "h2=warn", "html5ever=warn", "selectors=warn"] {
            filter = filter.add_directive(directive.parse()?);
        }
    }
    Ok(filter)
}

/// Rename a previous run's log file to `<stem>.<timestamp>.log`
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path).map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata.modified().unwrap_or_else(|_| std::time::SystemTime::now());
    let stamp: chrono::DateTime<Local> = file_time.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let rotated = log_dir.join(format!("{}.{}.log", file_stem, stamp.format("%Y%m%dT%H%M%S")));
    std::fs::rename(&log_file_path, &rotated).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            rotated.display(),
            e
        )
    })?;
    Ok(())
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(&config.level)?;
    let registry = Registry::default().with(env_filter);

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    let file_layer = if config.file_output {
        std::fs::create_dir_all(&config.log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e))?;
        rotate_existing_log_file(&config.log_dir, LOG_FILE_NAME)?;

        let (file_writer, guard) = non_blocking(rolling::never(&config.log_dir, LOG_FILE_NAME));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard store poisoned"))?
            .push(guard);

        Some(
            fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .with_ansi(false),
        )
    } else {
        None
    };

    if console_layer.is_none() && file_layer.is_none() {
        return Err(anyhow!("No logging output configured"));
    }

    registry
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    info!("Logging system initialized (level: {})", config.level);
    if config.file_output {
        info!("Log file: {:?}", config.log_dir.join(LOG_FILE_NAME));
    }
    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Catalog Watch System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
    info!("========================================");
}
