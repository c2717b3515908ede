//! Error taxonomy for the fetch, notify and persist seams

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve one catalog page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("connection refused: {url}")]
    ConnectionRefused { url: String },

    #[error("HTTP status {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("fetch failed: {url} - {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt at the same page may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Other { .. } => false,
        }
    }

    /// 4xx other than 429: the page does not exist or is refused
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if (400..500).contains(status) && *status != 429)
    }
}

/// Failure to deliver one notification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("messaging channel unreachable: {0}")]
    ChannelUnreachable(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("notification failed: {0}")]
    Other(String),
}

/// Failure to load or write the seen-set state file
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn status(code: u16) -> FetchError {
        FetchError::HttpStatus {
            status: code,
            url: "https://shop.example/catalog/p2".to_string(),
        }
    }

    #[rstest]
    #[case(500, true, false)]
    #[case(503, true, false)]
    #[case(429, true, false)]
    #[case(404, false, true)]
    #[case(403, false, true)]
    fn classifies_http_status(#[case] code: u16, #[case] transient: bool, #[case] client: bool) {
        let err = status(code);
        assert_eq!(err.is_transient(), transient);
        assert_eq!(err.is_client_error(), client);
    }

    #[test]
    fn network_failures_are_transient() {
        let url = "https://shop.example".to_string();
        assert!(FetchError::Timeout { url: url.clone() }.is_transient());
        assert!(FetchError::ConnectionRefused { url: url.clone() }.is_transient());
        assert!(!FetchError::Other { url, message: "bad body".to_string() }.is_transient());
    }
}
