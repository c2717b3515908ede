//! Seen-set and delta computation
//!
//! The seen-set is the record of every product identifier that has already
//! been notified. It only ever grows.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::Product;

/// Metadata kept for a notified product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub first_seen: DateTime<Utc>,
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC (older state files)
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

impl SeenEntry {
    /// Entry with no product metadata, first seen now
    pub fn bare() -> Self {
        Self {
            name: None,
            price: None,
            url: None,
            first_seen: Utc::now(),
        }
    }

    pub fn for_product(product: &Product) -> Self {
        Self {
            name: Some(product.name.clone()),
            price: Some(product.price.clone()),
            url: Some(product.url.clone()),
            first_seen: Utc::now(),
        }
    }
}

/// Identifier -> entry map. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenSet {
    entries: BTreeMap<String, SeenEntry>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from bare identifiers (legacy state files)
    pub fn from_identifiers<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for id in ids {
            set.insert(id.into(), SeenEntry::bare());
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert unless already present. Returns true when the identifier was new.
    pub fn insert(&mut self, id: String, entry: SeenEntry) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, entry);
        true
    }

    pub fn get(&self, id: &str) -> Option<&SeenEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Products of `scan` whose identifier `is_new` accepts, in scan order.
///
/// An identifier repeated within the scan is only reported at its first
/// occurrence.
pub fn compute_delta<F>(scan: &[Product], is_new: F) -> Vec<Product>
where
    F: Fn(&str) -> bool,
{
    let mut emitted: HashSet<&str> = HashSet::new();
    scan.iter()
        .filter(|product| is_new(&product.id) && emitted.insert(product.id.as_str()))
        .cloned()
        .collect()
}
