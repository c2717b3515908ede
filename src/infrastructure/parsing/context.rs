//! Parsing context for list pages

/// Context information for parsing one catalog page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    /// 1-based page index, for logging
    pub page: u32,

    /// URL the page was fetched from; relative links resolve against it
    pub page_url: String,
}

impl ParseContext {
    pub fn new(page: u32, page_url: impl Into<String>) -> Self {
        Self {
            page,
            page_url: page_url.into(),
        }
    }
}
