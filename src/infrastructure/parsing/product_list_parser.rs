//! Product list parser
//!
//! Structural matching of catalog list pages against the configured CSS
//! anchors. An entry whose anchors cannot be found is skipped; it never fails
//! the whole page.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::ProductListSelectors;
use super::{ContextualParser, ParseContext, ParseError, ParseResult};
use crate::domain::product::Product;

/// Parser for extracting product information from listing pages
pub struct ProductListParser {
    /// Compiled CSS selectors for different page elements
    container_selectors: Vec<Selector>,
    link_selectors: Vec<Selector>,
    name_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
}

/// Why a container was not turned into a product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NoLink,
    NoName,
    UnresolvableLink,
}

impl ProductListParser {
    /// Create a parser with the default selectors
    pub fn new() -> ParseResult<Self> {
        Self::with_selectors(&ProductListSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_selectors(selectors: &ProductListSelectors) -> ParseResult<Self> {
        Ok(Self {
            container_selectors: Self::compile_selectors("product_container", &selectors.product_container)?,
            link_selectors: Self::compile_selectors("product_link", &selectors.product_link)?,
            name_selectors: Self::compile_selectors("name", &selectors.name)?,
            price_selectors: Self::compile_selectors("price", &selectors.price)?,
            image_selectors: Self::compile_selectors("image", &selectors.image)?,
        })
    }

    /// Compile selector strings; any invalid selector is a configuration error
    fn compile_selectors(field: &'static str, selector_strings: &[String]) -> ParseResult<Vec<Selector>> {
        if selector_strings.is_empty() && field != "image" {
            return Err(ParseError::NoSelectors { field });
        }

        selector_strings
            .iter()
            .map(|s| Selector::parse(s).map_err(|e| ParseError::invalid_selector(field, s, e)))
            .collect()
    }

    /// Parse a raw page into products, in document order
    pub fn parse(&self, document: &str, context: &ParseContext) -> ParseResult<Vec<Product>> {
        self.parse_with_context(document, context)
    }

    fn extract_product(&self, element: &ElementRef, context: &ParseContext) -> Result<Product, SkipReason> {
        let link = first_match(element, &self.link_selectors)
            .and_then(|a| a.value().attr("href").map(|href| (a, href.trim())))
            .filter(|(_, href)| !href.is_empty());

        let name = self.extract_text(element, &self.name_selectors);
        let price = self.extract_text(element, &self.price_selectors);
        let image_url = first_match(element, &self.image_selectors)
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve_url(src, &context.page_url));

        match link {
            Some((anchor, href)) => {
                let url = resolve_url(href, &context.page_url).ok_or(SkipReason::UnresolvableLink)?;
                let name = name
                    .or_else(|| Some(element_text(&anchor)).filter(|t| !t.is_empty()))
                    .ok_or(SkipReason::NoName)?;
                Ok(Product::from_listing(url, name, price, image_url))
            }
            // Without a link both name and price anchors are required
            None => match (name, price) {
                (Some(name), Some(price)) => Ok(Product::without_link(
                    name,
                    Some(price),
                    &context.page_url,
                    image_url,
                )),
                _ => Err(SkipReason::NoLink),
            },
        }
    }

    /// Extract text content using multiple selectors as fallbacks
    fn extract_text(&self, element: &ElementRef, selectors: &[Selector]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            element
                .select(selector)
                .map(|e| element_text(&e))
                .find(|text| !text.is_empty())
        })
    }
}

impl ContextualParser for ProductListParser {
    type Output = Vec<Product>;
    type Context = ParseContext;

    fn parse_with_context(&self, document: &str, context: &Self::Context) -> ParseResult<Self::Output> {
        if document.trim().is_empty() {
            return Err(ParseError::EmptyDocument {
                url: context.page_url.clone(),
            });
        }
        if !looks_like_markup(document) {
            return Err(ParseError::NotMarkup {
                url: context.page_url.clone(),
            });
        }

        let html = Html::parse_document(document);

        // First container selector with any match wins
        let containers: Vec<ElementRef> = self
            .container_selectors
            .iter()
            .map(|selector| html.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        if containers.is_empty() {
            debug!("No product containers on page {}", context.page);
            return Ok(Vec::new());
        }

        let mut products = Vec::with_capacity(containers.len());
        let mut skipped = 0usize;
        for (index, element) in containers.iter().enumerate() {
            match self.extract_product(element, context) {
                Ok(product) => products.push(product),
                Err(reason) => {
                    skipped += 1;
                    debug!("Skipping entry {} on page {}: {:?}", index, context.page, reason);
                }
            }
        }

        if skipped > 0 {
            warn!(
                "⚠️ Page {}: skipped {} of {} entries with missing anchors",
                context.page,
                skipped,
                containers.len()
            );
        }

        debug!("Extracted {} products from page {}", products.len(), context.page);
        Ok(products)
    }
}

fn first_match<'a>(element: &ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|selector| element.select(selector).next())
}

/// Visible text with whitespace runs collapsed
fn element_text(element: &ElementRef) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Resolve `href` against the page it was found on
fn resolve_url(href: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let resolved = base.join(href.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// At least one `<tag`, `</tag` or `<!` sequence
fn looks_like_markup(document: &str) -> bool {
    document
        .as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/' || w[1] == b'!'))
}
