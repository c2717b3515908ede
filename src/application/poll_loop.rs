//! Polling loop: scan, diff, notify, persist, sleep
//!
//! A cycle failure is logged with the phase it happened in and the loop
//! carries on with the next cycle. The seen-set store is owned here and
//! nowhere else.

#![allow(clippy::uninlined_format_args)]

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::catalog_scanner::{CatalogScanner, ScanError};
use crate::domain::{compute_delta, NotifyError, Notifier, PersistError, Product, SeenStore};
use crate::infrastructure::config::{defaults, AppConfig};

/// Longest wait honoured for a rate-limit response
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Base pause between persist attempts within one cycle
const PERSIST_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Scanning,
    Diffing,
    Notifying,
    Persisting,
    Sleeping,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Diffing => "diffing",
            Self::Notifying => "notifying",
            Self::Persisting => "persisting",
            Self::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// A cycle that could not complete
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("state not saved after {attempts} attempt(s): {source}")]
    Persist {
        attempts: u32,
        #[source]
        source: PersistError,
    },
}

impl CycleError {
    pub fn phase(&self) -> CyclePhase {
        match self {
            Self::Scan(_) => CyclePhase::Scanning,
            Self::Persist { .. } => CyclePhase::Persisting,
        }
    }
}

/// Outcome of one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub check_number: u64,
    pub products_found: usize,
    pub pages_fetched: u32,
    pub scan_complete: bool,
    pub new_products: usize,
    /// Identifiers delivered and marked seen, in delivery order
    pub notified: Vec<String>,
    /// Identifiers left unmarked for the next cycle
    pub failed: Vec<(String, NotifyError)>,
    pub persisted: bool,
}

/// Timing knobs of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub interval: Duration,
    /// Pause between two consecutive notifications
    pub notify_delay: Duration,
    pub persist_attempts: u32,
}

impl LoopSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            interval: config.check_interval(),
            notify_delay: config.notify_delay(),
            persist_attempts: defaults::PERSIST_ATTEMPTS,
        }
    }
}

pub struct PollLoop<S: SeenStore> {
    scanner: CatalogScanner,
    store: S,
    notifier: Arc<dyn Notifier>,
    settings: LoopSettings,
    phase: CyclePhase,
    checks: u64,
}

impl<S: SeenStore> PollLoop<S> {
    pub fn new(scanner: CatalogScanner, store: S, notifier: Arc<dyn Notifier>, settings: LoopSettings) -> Self {
        Self {
            scanner,
            store,
            notifier,
            settings,
            phase: CyclePhase::Idle,
            checks: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn checks(&self) -> u64 {
        self.checks
    }

    fn enter(&mut self, phase: CyclePhase) {
        debug!("Cycle phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// One full cycle. Notification failures are reported, not raised.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.checks += 1;
        let mut report = CycleReport {
            check_number: self.checks,
            ..CycleReport::default()
        };
        info!("🔍 Check #{} started ({} products already seen)", self.checks, self.store.len());

        self.enter(CyclePhase::Scanning);
        let scan = match self.scanner.scan_all().await {
            Ok(scan) => scan,
            Err(e) => {
                self.enter(CyclePhase::Idle);
                return Err(e.into());
            }
        };
        report.products_found = scan.products.len();
        report.pages_fetched = scan.pages_fetched;
        report.scan_complete = scan.complete;
        if scan.products.is_empty() {
            warn!("⚠️ No products found in the catalog. The site may be down or its layout may have changed");
        }

        self.enter(CyclePhase::Diffing);
        let delta = compute_delta(&scan.products, |id| self.store.is_new(id));
        report.new_products = delta.len();

        self.enter(CyclePhase::Notifying);
        for (index, product) in delta.iter().enumerate() {
            if index > 0 && !self.settings.notify_delay.is_zero() {
                tokio::time::sleep(self.settings.notify_delay).await;
            }
            match self.deliver(product).await {
                Ok(()) => {
                    self.store.mark_product_seen(product);
                    report.notified.push(product.id.clone());
                }
                Err(e) => {
                    warn!("⚠️ Notification for {} ({}) failed: {}", product.id, product.name, e);
                    report.failed.push((product.id.clone(), e));
                }
            }
        }

        self.enter(CyclePhase::Persisting);
        if self.store.has_unsaved_changes() {
            if let Err(e) = self.persist_with_retry().await {
                self.enter(CyclePhase::Idle);
                return Err(e);
            }
            report.persisted = true;
        }

        self.enter(CyclePhase::Idle);
        Ok(report)
    }

    /// Notify once, and once more after a rate-limit pause
    async fn deliver(&self, product: &Product) -> Result<(), NotifyError> {
        match self.notifier.notify(product).await {
            Err(NotifyError::RateLimited { retry_after }) => {
                let wait = retry_after.min(MAX_RATE_LIMIT_WAIT);
                warn!("⏳ Rate limited, retrying {} in {:?}", product.id, wait);
                tokio::time::sleep(wait).await;
                self.notifier.notify(product).await
            }
            other => other,
        }
    }

    async fn persist_with_retry(&mut self) -> Result<(), CycleError> {
        let attempts = self.settings.persist_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.persist() {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= attempts => {
                    error!("❌ Could not save state after {} attempt(s): {}", attempts, source);
                    return Err(CycleError::Persist { attempts, source });
                }
                Err(e) => {
                    warn!("💾 Save attempt {}/{} failed: {}", attempt, attempts, e);
                    tokio::time::sleep(PERSIST_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Single-shot mode
    pub async fn run_once(&mut self) -> Result<CycleReport, CycleError> {
        let outcome = self.run_cycle().await;
        match &outcome {
            Ok(report) => log_report(report),
            Err(e) => error!("❌ Check #{} failed while {}: {}", self.checks, e.phase(), e),
        }
        outcome
    }

    /// Continuous mode. Runs until `shutdown` resolves, then flushes any
    /// unsaved state. Returns the number of checks started.
    pub async fn run_forever<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("🤖 Monitoring started, checking every {:?}", self.settings.interval);

        loop {
            let outcome = tokio::select! {
                outcome = self.run_cycle() => Some(outcome),
                () = &mut shutdown => None,
            };
            match outcome {
                Some(Ok(report)) => log_report(&report),
                Some(Err(e)) => error!("❌ Check #{} failed while {}: {}", self.checks, e.phase(), e),
                None => {
                    info!("🛑 Shutdown requested during check #{}", self.checks);
                    break;
                }
            }

            self.enter(CyclePhase::Sleeping);
            info!("⏰ Next check in {}s", self.settings.interval.as_secs());
            tokio::select! {
                () = tokio::time::sleep(self.settings.interval) => {}
                () = &mut shutdown => {
                    info!("🛑 Shutdown requested");
                    break;
                }
            }
        }

        self.enter(CyclePhase::Idle);
        if self.store.has_unsaved_changes() {
            if let Err(e) = self.persist_with_retry().await {
                error!("❌ Final save failed: {}", e);
            }
        }
        self.checks
    }
}

fn log_report(report: &CycleReport) {
    info!(
        "📊 Check #{}: {} products on {} page(s), {} new, {} notified, {} failed",
        report.check_number,
        report.products_found,
        report.pages_fetched,
        report.new_products,
        report.notified.len(),
        report.failed.len()
    );
    if !report.scan_complete {
        warn!("⚠️ Check #{} did not see the whole catalog", report.check_number);
    }
    if report.new_products == 0 {
        info!("✅ No new products");
    }
}
