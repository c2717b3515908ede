//! Parsing configuration for HTML extraction
//!
//! Centralized configuration for the CSS anchors of a catalog list page.
//! Every field is an ordered list of fallbacks; the first selector that
//! matches wins.

use serde::{Deserialize, Serialize};

/// CSS selectors for product list pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductListSelectors {
    /// Selectors for one product container element
    pub product_container: Vec<String>,

    /// Selectors for the product page link inside a container
    pub product_link: Vec<String>,

    /// Selectors for the display name inside a container
    pub name: Vec<String>,

    /// Selectors for the display price inside a container
    pub price: Vec<String>,

    /// Selectors for the product image inside a container
    pub image: Vec<String>,
}

impl Default for ProductListSelectors {
    fn default() -> Self {
        Self {
            product_container: vec![
                ".product-item, .product, article.product, .item-product".to_string(),
                "[class*='product']".to_string(),
            ],
            product_link: vec![
                "a[href*='/product'], a[href*='/produs'], a.product-link".to_string(),
                "a[href]".to_string(),
            ],
            name: vec![
                ".product-name, .product-title".to_string(),
                "h2, h3".to_string(),
                ".title".to_string(),
            ],
            price: vec![
                ".price, .product-price".to_string(),
                "[class*='price']".to_string(),
            ],
            image: vec!["img[src]".to_string()],
        }
    }
}
