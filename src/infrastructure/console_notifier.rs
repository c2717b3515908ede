//! Stdout notifier, used when Telegram delivery is switched off

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::domain::{NotifyError, Notifier, Product};

/// Prints each new product as a numbered entry
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    printed: AtomicUsize,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printed(&self) -> usize {
        self.printed.load(Ordering::Relaxed)
    }
}

/// Console block for the `n`th product of a run
pub fn format_console_entry(n: usize, product: &Product) -> String {
    let mut entry = format!("{}. {}\n   💰 Price: {}\n   🔗 URL: {}", n, product.name, product.price, product.url);
    if let Some(image) = &product.image_url {
        entry.push_str(&format!("\n   🖼️ Image: {image}"));
    }
    entry
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, product: &Product) -> Result<(), NotifyError> {
        let n = self.printed.fetch_add(1, Ordering::Relaxed) + 1;
        println!("\n{}", format_console_entry(n, product));
        Ok(())
    }

    async fn send_status(&self, text: &str) -> Result<(), NotifyError> {
        info!("ℹ️ {}", text);
        Ok(())
    }

    async fn check_connection(&self) -> Result<String, NotifyError> {
        Ok("console".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::product;

    #[test]
    fn formats_numbered_entry() {
        let entry = format_console_entry(2, &product("77"));
        assert_eq!(
            entry,
            "2. Product 77\n   💰 Price: 10 lei\n   🔗 URL: https://shop.example/produs/77"
        );
    }

    #[tokio::test]
    async fn counts_printed_products() {
        let notifier = ConsoleNotifier::new();
        notifier.notify(&product("1")).await.unwrap();
        notifier.notify(&product("2")).await.unwrap();
        assert_eq!(notifier.printed(), 2);
        assert_eq!(notifier.check_connection().await.unwrap(), "console");
    }
}
