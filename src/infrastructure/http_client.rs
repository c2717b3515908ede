//! HTTP client for catalog pages
//!
//! One GET per call with an explicit timeout. Retry decisions belong to the
//! catalog scanner, so failures are only classified here.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::domain::{FetchError, FetchedPage, PageFetcher};
use crate::infrastructure::config::{utils::catalog_page_url, CatalogConfig};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// First catalog page
    pub catalog_url: String,
    /// URL template for pages 2+
    pub page_url_template: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Whether to follow redirects
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    /// Create HttpClientConfig from the catalog section of the settings file
    pub fn from_catalog_config(catalog: &CatalogConfig) -> Self {
        Self {
            catalog_url: catalog.catalog_url.clone(),
            page_url_template: catalog.page_url_template.clone(),
            timeout_seconds: catalog.request_timeout_seconds,
            user_agent: catalog.user_agent.clone(),
            follow_redirects: true,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_catalog_config(&CatalogConfig::default())
    }
}

/// HTTP client fetching catalog pages by index
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    /// URL of a 1-based catalog page
    pub fn page_url(&self, page: u32) -> String {
        catalog_page_url(&self.config.catalog_url, &self.config.page_url_template, page)
    }

    /// Single GET returning the body of a 2xx response
    async fn fetch_html_string_once(&self, url: &str) -> Result<String, FetchError> {
        info!("🌐 HTTP GET: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            error!("❌ HTTP error {}: {}", status, url);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, page: u32) -> Result<FetchedPage, FetchError> {
        let url = self.page_url(page);
        let body = self.fetch_html_string_once(&url).await?;
        Ok(FetchedPage { page, url, body })
    }
}

/// Map a transport-level reqwest failure onto the fetch error taxonomy
fn classify_request_error(url: &str, error: &reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::ConnectionRefused { url }
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus {
            status: status.as_u16(),
            url,
        }
    } else {
        FetchError::Other {
            url,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::spawn_http_stub;

    fn client_for(catalog_url: &str) -> HttpClient {
        HttpClient::with_config(HttpClientConfig {
            catalog_url: catalog_url.to_string(),
            page_url_template: "{base}/p{page}".to_string(),
            timeout_seconds: 5,
            user_agent: "Test Agent".to_string(),
            follow_redirects: false,
        })
        .unwrap()
    }

    #[test]
    fn test_client_creation() {
        assert!(HttpClient::with_config(HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn builds_page_urls_from_template() {
        let client = client_for("https://shop.example/catalog/produse-recente");
        assert_eq!(client.page_url(1), "https://shop.example/catalog/produse-recente");
        assert_eq!(client.page_url(4), "https://shop.example/catalog/produse-recente/p4");
    }

    #[tokio::test]
    async fn fetches_page_body() {
        let (base, server) = spawn_http_stub(vec![(200, "<html>ok</html>".to_string())]).await;
        let client = client_for(&format!("{base}/catalog"));

        let page = client.fetch(2).await.unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.url, format!("{base}/catalog/p2"));
        assert_eq!(page.body, "<html>ok</html>");
        let requests = server.await.unwrap();
        assert_eq!(requests[0].request_line, "GET /catalog/p2 HTTP/1.1");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, server) = spawn_http_stub(vec![(503, String::new()), (404, String::new())]).await;
        let client = client_for(&format!("{base}/catalog"));

        let err = client.fetch(1).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }));
        assert!(err.is_transient());

        let err = client.fetch(2).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
        assert!(err.is_client_error());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        // Bind then drop to get a local port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}/catalog"));
        let err = client.fetch(1).await.unwrap_err();

        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
