//! Full catalog pass: page after page until the listing runs out
//!
//! Pages are fetched strictly one at a time. Transient fetch failures are
//! retried with a linearly growing delay; anything else ends the pass.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{FetchError, FetchedPage, PageFetcher, Product};
use crate::infrastructure::config::CatalogConfig;
use crate::infrastructure::parsing::{ParseContext, ParseError, ProductListParser};

/// Pagination and retry limits for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    pub max_pages: u32,
    /// Attempts per page, first try included
    pub max_attempts: u32,
    /// Delay before retry `n` is `retry_delay * n`
    pub retry_delay: Duration,
}

impl ScanPolicy {
    pub fn from_catalog_config(config: &CatalogConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_attempts: config.max_fetch_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::from_catalog_config(&CatalogConfig::default())
    }
}

/// Why a pass stopped before the natural end of the catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    #[error("page {page} failed after {attempts} attempt(s): {error}")]
    PageFetchFailed { page: u32, attempts: u32, error: FetchError },

    #[error("page {page} could not be parsed: {reason}")]
    PageParseFailed { page: u32, reason: String },

    #[error("stopped at the page limit ({max_pages}), later pages were not visited")]
    PageLimitReached { max_pages: u32 },
}

/// Products of one pass in page order, then listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub products: Vec<Product>,
    pub pages_fetched: u32,
    /// False when a failing page cut the pass short
    pub complete: bool,
    pub warnings: Vec<ScanWarning>,
}

impl Default for ScanResult {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            pages_fetched: 0,
            complete: true,
            warnings: Vec::new(),
        }
    }
}

impl ScanResult {
    fn cut_short(&mut self, warning: ScanWarning) {
        warn!("⚠️ Scan incomplete: {}", warning);
        self.complete = false;
        self.warnings.push(warning);
    }
}

/// Nothing usable came out of the pass
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("first catalog page could not be fetched after {attempts} attempt(s): {source}")]
    FirstPageFetch {
        attempts: u32,
        #[source]
        source: FetchError,
    },

    #[error("first catalog page could not be parsed: {0}")]
    FirstPageParse(#[source] ParseError),
}

pub struct CatalogScanner {
    fetcher: Arc<dyn PageFetcher>,
    parser: ProductListParser,
    policy: ScanPolicy,
}

impl CatalogScanner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: ProductListParser, policy: ScanPolicy) -> Self {
        Self { fetcher, parser, policy }
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Walk the catalog from page 1.
    ///
    /// Stops at the first page with no products, at a 4xx past page 1, at
    /// the page limit, or at a page that keeps failing. Only a failure on
    /// page 1 is an error; later failures return what was collected with
    /// `complete == false`.
    pub async fn scan_all(&self) -> Result<ScanResult, ScanError> {
        let mut result = ScanResult::default();

        for page in 1..=self.policy.max_pages {
            let fetched = match self.fetch_with_retry(page).await {
                Ok(fetched) => fetched,
                Err((source, attempts)) if page == 1 => return Err(ScanError::FirstPageFetch { attempts, source }),
                Err((e, _)) if e.is_client_error() => {
                    info!("📄 Page {} not available ({}), end of catalog", page, e);
                    return Ok(result);
                }
                Err((error, attempts)) => {
                    result.cut_short(ScanWarning::PageFetchFailed { page, attempts, error });
                    return Ok(result);
                }
            };
            result.pages_fetched += 1;

            let context = ParseContext::new(page, fetched.url.as_str());
            let products = match self.parser.parse(&fetched.body, &context) {
                Ok(products) => products,
                Err(e) if page == 1 => {
                    if e.is_structural() {
                        warn!("⚠️ The catalog did not return a readable page. The site may be down or changed");
                    }
                    return Err(ScanError::FirstPageParse(e));
                }
                Err(e) => {
                    result.cut_short(ScanWarning::PageParseFailed {
                        page,
                        reason: e.to_string(),
                    });
                    return Ok(result);
                }
            };

            if products.is_empty() {
                debug!("Page {} lists no products, end of catalog", page);
                return Ok(result);
            }

            debug!("Page {}: {} products", page, products.len());
            result.products.extend(products);

            if page == self.policy.max_pages {
                let warning = ScanWarning::PageLimitReached {
                    max_pages: self.policy.max_pages,
                };
                warn!("⚠️ {}", warning);
                result.warnings.push(warning);
            }
        }

        Ok(result)
    }

    /// On failure, also returns how many attempts were made
    async fn fetch_with_retry(&self, page: u32) -> Result<FetchedPage, (FetchError, u32)> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(page).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.retry_delay * attempt;
                    warn!(
                        "🔄 Page {} attempt {}/{} failed: {}. Retrying in {:?}",
                        page, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}
