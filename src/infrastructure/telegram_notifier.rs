//! Telegram Bot API notifier
//!
//! One `sendMessage` call per new product, HTML formatted.

#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{NotifyError, Notifier, Product};
use crate::infrastructure::config::AppConfig;

// Caps on the escaped fields; with the template they stay under the
// 4096 character limit Telegram puts on message text
const MAX_NAME_CHARS: usize = 1000;
const MAX_PRICE_CHARS: usize = 200;
const MAX_URL_CHARS: usize = 2000;

/// Wait used when a 429 carries no `retry_after`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            bot_token: config.telegram_bot_token.trim().to_string(),
            chat_id: config.telegram_chat_id.trim().to_string(),
            api_base: config.telegram_api_base.trim_end_matches('/').to_string(),
            timeout: config.catalog.request_timeout(),
        }
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create Telegram client: {}", e))?;

        Ok(Self {
            client,
            api_url: format!("{}/bot{}", config.api_base, config.bot_token),
            chat_id: config.chat_id,
        })
    }

    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self
            .client
            .post(format!("{}/sendMessage", self.api_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            // Telegram reports some failures with 200 and ok=false
            if let Ok(parsed) = serde_json::from_str::<ApiResponse>(&body) {
                if !parsed.ok {
                    return Err(NotifyError::Other(
                        parsed.description.unwrap_or_else(|| "ok=false".to_string()),
                    ));
                }
            }
            debug!("📨 Telegram message delivered");
            return Ok(());
        }

        let err = classify_api_failure(status, &body);
        warn!("⚠️ Telegram sendMessage failed ({}): {}", status, err);
        Err(err)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, product: &Product) -> Result<(), NotifyError> {
        self.send_message(&format_product_message(product)).await
    }

    async fn send_status(&self, text: &str) -> Result<(), NotifyError> {
        self.send_message(&format!("ℹ️ {}", escape_html(text))).await
    }

    async fn check_connection(&self) -> Result<String, NotifyError> {
        let response = self
            .client
            .get(format!("{}/getMe", self.api_url))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_api_failure(status, &body));
        }

        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| NotifyError::Other(format!("invalid getMe response: {e}")))?;
        if !parsed.ok {
            return Err(NotifyError::Other(
                parsed.description.unwrap_or_else(|| "getMe returned ok=false".to_string()),
            ));
        }

        let username = parsed
            .result
            .as_ref()
            .and_then(|r| r.get("username"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        Ok(format!("@{username}"))
    }
}

/// HTML message for one product
pub fn format_product_message(product: &Product) -> String {
    format!(
        "🎉 <b>New product!</b>\n\n<b>{}</b>\n💰 Price: {}\n🔗 <a href=\"{}\">View product</a>",
        clip_escaped(&escape_html(&product.name), MAX_NAME_CHARS),
        clip_escaped(&escape_html(&product.price), MAX_PRICE_CHARS),
        clip_escaped(&escape_html(&product.url), MAX_URL_CHARS),
    )
}

/// Cut escaped text to `max_chars` without splitting an entity such as `&amp;`
fn clip_escaped(escaped: &str, max_chars: usize) -> String {
    let end = match escaped.char_indices().nth(max_chars) {
        Some((end, _)) => end,
        None => return escaped.to_string(),
    };
    let mut clipped = &escaped[..end];
    if let Some(amp) = clipped.rfind('&') {
        if !clipped[amp..].contains(';') {
            clipped = &clipped[..amp];
        }
    }
    clipped.to_string()
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn classify_transport_error(error: &reqwest::Error) -> NotifyError {
    if error.is_timeout() || error.is_connect() {
        NotifyError::ChannelUnreachable(error.to_string())
    } else {
        NotifyError::Other(error.to_string())
    }
}

/// Map a non-2xx Bot API response onto the notify error taxonomy
fn classify_api_failure(status: StatusCode, body: &str) -> NotifyError {
    let parsed = serde_json::from_str::<ApiResponse>(body).ok();
    let description = parsed
        .as_ref()
        .and_then(|p| p.description.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = parsed
                .and_then(|p| p.parameters)
                .and_then(|p| p.retry_after)
                .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs);
            NotifyError::RateLimited { retry_after }
        }
        StatusCode::FORBIDDEN => NotifyError::InvalidDestination(description),
        StatusCode::BAD_REQUEST if description.to_lowercase().contains("chat not found") => {
            NotifyError::InvalidDestination(description)
        }
        s if s.is_server_error() => NotifyError::ChannelUnreachable(description),
        _ => NotifyError::Other(description),
    }
}
