use serde::{Deserialize, Serialize};
use url::Url;

/// Placeholder shown when a listing carries no price text
pub const PRICE_PLACEHOLDER: &str = "N/A";

/// One catalog listing as scraped from a list page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Dedup key, stable across re-scrapes of the same listing
    pub id: String,
    pub name: String,
    /// Opaque display price, currency symbol included
    pub price: String,
    pub url: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Build a product whose identifier is derived from its absolute URL
    pub fn from_listing(url: String, name: String, price: Option<String>, image_url: Option<String>) -> Self {
        let id = identifier_from_url(&url);
        Self {
            id,
            name,
            price: price.unwrap_or_else(|| PRICE_PLACEHOLDER.to_string()),
            url,
            image_url,
        }
    }

    /// Build a product for an entry without a link.
    ///
    /// The identifier falls back to a `name|price` composite and the URL points
    /// at the catalog page the entry was found on.
    pub fn without_link(name: String, price: Option<String>, page_url: &str, image_url: Option<String>) -> Self {
        let price = price.unwrap_or_else(|| PRICE_PLACEHOLDER.to_string());
        Self {
            id: format!("{name}|{price}"),
            name,
            price,
            url: page_url.to_string(),
            image_url,
        }
    }

    /// Whether the scraped price text was missing
    pub fn has_price(&self) -> bool {
        self.price != PRICE_PLACEHOLDER
    }
}

/// Derive a dedup identifier from a product URL.
///
/// Order of preference: a trailing all-digit path segment, then the `id`
/// query parameter, then the full URL text.
pub fn identifier_from_url(product_url: &str) -> String {
    let Ok(parsed) = Url::parse(product_url) else {
        return product_url.to_string();
    };

    let last_segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last());

    if let Some(segment) = last_segment {
        if segment.chars().all(|c| c.is_ascii_digit()) {
            return segment.to_string();
        }
    }

    if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "id") {
        if !value.is_empty() {
            return value.into_owned();
        }
    }

    product_url.to_string()
}
