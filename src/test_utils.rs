//! Test utilities for catalog-watch
//!
//! In-memory fakes for the service seams and a throwaway HTTP server that
//! replays canned responses, so tests never touch the network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::domain::{FetchError, FetchedPage, NotifyError, PageFetcher, Product, Notifier};

/// Minimal catalog page with one container per `(id, name, price)`
pub fn catalog_page(items: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<html><body><div class=\"products\">");
    for (id, name, price) in items {
        html.push_str(&format!(
            "<div class=\"product-item\"><a href=\"/produs/{id}\"><h3 class=\"product-name\">{name}</h3></a><span class=\"price\">{price}</span></div>"
        ));
    }
    html.push_str("</div></body></html>");
    html
}

pub fn product(id: &str) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        price: "10 lei".to_string(),
        url: format!("https://shop.example/produs/{id}"),
        image_url: None,
    }
}

/// Page fetcher replaying scripted outcomes per page.
///
/// Each page has a queue of outcomes; the last outcome repeats once the
/// queue is drained. Unscripted pages return an empty catalog page.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<u32, VecDeque<Result<String, FetchError>>>>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, page: u32, body: String) -> Self {
        self.outcome(page, Ok(body))
    }

    pub fn outcome(self, page: u32, outcome: Result<String, FetchError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, page: u32) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(page);
        let outcome = {
            let mut script = self.script.lock().unwrap();
            match script.get_mut(&page) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap(),
                None => Ok(catalog_page(&[])),
            }
        };
        outcome.map(|body| FetchedPage {
            page,
            url: format!("https://shop.example/catalog/p{page}"),
            body,
        })
    }
}

/// Notifier recording every delivered product, failing for chosen ids
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<String>>,
    failing: Mutex<HashMap<String, NotifyError>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, id: &str, error: NotifyError) {
        self.failing.lock().unwrap().insert(id.to_string(), error);
    }

    pub fn recover(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, product: &Product) -> Result<(), NotifyError> {
        if let Some(err) = self.failing.lock().unwrap().get(&product.id) {
            return Err(err.clone());
        }
        self.delivered.lock().unwrap().push(product.id.clone());
        Ok(())
    }

    async fn send_status(&self, text: &str) -> Result<(), NotifyError> {
        self.statuses.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn check_connection(&self) -> Result<String, NotifyError> {
        Ok("recording".to_string())
    }
}

/// One recorded request received by the stub server
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub request_line: String,
    pub body: String,
}

/// Serve `responses` (status, body) in order, one connection each.
///
/// Returns the base URL and a handle resolving to the requests received.
pub async fn spawn_http_stub(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<StubRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut received = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            received.push(read_request(&mut socket).await);

            let response = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
        received
    });

    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> StubRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    StubRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}
