//! Service seams of the change-detection pipeline
//!
//! The pipeline only talks to the outside world through these traits, so the
//! scanner and poll loop can run against in-memory fakes.

use async_trait::async_trait;

use super::errors::{FetchError, NotifyError, PersistError};
use super::product::Product;

/// Raw catalog page as returned by a [`PageFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// 1-based page index
    pub page: u32,
    /// Absolute URL the page was fetched from, used to resolve relative links
    pub url: String,
    pub body: String,
}

/// Source of catalog pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a single page. Exactly one request, no internal retries.
    async fn fetch(&self, page: u32) -> Result<FetchedPage, FetchError>;
}

/// Sink for new-product notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification for `product`
    async fn notify(&self, product: &Product) -> Result<(), NotifyError>;

    /// Free-form status line (bot started, bot stopped)
    async fn send_status(&self, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    /// Verify the channel is reachable. Returns a short description of the
    /// remote endpoint on success.
    async fn check_connection(&self) -> Result<String, NotifyError>;
}

/// Durable record of notified identifiers
pub trait SeenStore: Send {
    /// Pure membership check
    fn is_new(&self, id: &str) -> bool;

    /// Add identifiers; already-present ones are left untouched
    fn mark_seen(&mut self, ids: &[&str]);

    /// Add a product together with its display metadata
    fn mark_product_seen(&mut self, product: &Product);

    /// Write the whole set to durable storage, all-or-nothing
    fn persist(&mut self) -> Result<(), PersistError>;

    /// True when the in-memory set holds entries not yet persisted
    fn has_unsaved_changes(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
