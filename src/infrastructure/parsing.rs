//! HTML parsing infrastructure
//!
//! Trait-based list page parsing with configurable selector fallbacks.

pub mod config;
pub mod context;
pub mod product_list_parser;

// Re-export public types
pub use crate::infrastructure::parsing_error::{ParseError, ParseResult};
pub use config::ProductListSelectors;
pub use context::ParseContext;
pub use product_list_parser::ProductListParser;

/// Parser over a raw document with contextual information
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse a raw document with contextual information
    fn parse_with_context(&self, document: &str, context: &Self::Context) -> ParseResult<Self::Output>;
}
