//! Parsing error types
//!
//! A page without products is not an error (it ends pagination). These
//! variants cover documents that cannot be read as a catalog page at all,
//! and selector configuration mistakes.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty document from {url}")]
    EmptyDocument { url: String },

    #[error("document from {url} is not HTML markup")]
    NotMarkup { url: String },

    #[error("invalid CSS selector '{selector}' for {field}: {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("no selectors configured for {field}")]
    NoSelectors { field: &'static str },
}

impl ParseError {
    pub fn invalid_selector(field: &'static str, selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            field,
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Structural errors point at a site layout change rather than a
    /// configuration mistake
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::EmptyDocument { .. } | Self::NotMarkup { .. })
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
