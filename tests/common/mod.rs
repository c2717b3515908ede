//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use catalog_watch_lib::domain::{FetchError, FetchedPage, Notifier, NotifyError, PageFetcher, Product};

pub const CATALOG_URL: &str = "https://shop.example/catalog/produse-recente";

/// Listing page in the shop's markup, one entry per `(id, name, price)`
pub fn listing(items: &[(&str, &str, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(id, name, price)| {
            format!(
                r#"<article class="product"><a href="/produs/{id}"><span class="product-name">{name}</span></a><span class="product-price">{price}</span></article>"#
            )
        })
        .collect();
    format!("<!DOCTYPE html><html><body><main>{entries}</main></body></html>")
}

/// Serves fixed pages; anything not listed is an empty catalog page
pub struct StaticCatalog {
    pages: Mutex<HashMap<u32, String>>,
    fetched: Mutex<Vec<u32>>,
}

impl StaticCatalog {
    pub fn new(pages: Vec<String>) -> Self {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, body)| (i as u32 + 1, body))
            .collect();
        Self {
            pages: Mutex::new(pages),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn replace_page(&self, page: u32, body: String) {
        self.pages.lock().unwrap().insert(page, body);
    }

    pub fn fetched(&self) -> Vec<u32> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticCatalog {
    async fn fetch(&self, page: u32) -> Result<FetchedPage, FetchError> {
        self.fetched.lock().unwrap().push(page);
        let url = if page <= 1 {
            CATALOG_URL.to_string()
        } else {
            format!("{CATALOG_URL}/p{page}")
        };
        let body = self
            .pages
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| listing(&[]));
        Ok(FetchedPage { page, url, body })
    }
}

/// Records delivered identifiers in order
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn notify(&self, product: &Product) -> Result<(), NotifyError> {
        if *self.offline.lock().unwrap() {
            return Err(NotifyError::ChannelUnreachable("outbox offline".to_string()));
        }
        self.sent.lock().unwrap().push(product.id.clone());
        Ok(())
    }

    async fn check_connection(&self) -> Result<String, NotifyError> {
        Ok("outbox".to_string())
    }
}
