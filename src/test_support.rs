//! Loopback servers and scripted fakes shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{FetchError, NotifyError};
use crate::models::{Item, MessageFormat, SourceConfig};
use crate::services::{Extraction, Notifier, SourceReader};

/// Read one request: headers plus a `content-length` body.
pub async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

/// Serve a single canned HTTP response and return the request text.
pub async fn serve_once(
    status_line: &'static str,
    extra_headers: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-length: {}\r\nconnection: close\r\n{extra_headers}\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (format!("http://{addr}/query"), handle)
}

/// Notifier that plays back scripted results, then succeeds.
pub struct ScriptedNotifier {
    script: Mutex<VecDeque<Result<(), NotifyError>>>,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<String>>,
}

impl ScriptedNotifier {
    pub fn new(script: Vec<Result<(), NotifyError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(Vec::new())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for ScriptedNotifier {
    async fn send(
        &self,
        _destination: &str,
        text: &str,
        _format: MessageFormat,
    ) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.delivered.lock().unwrap().push(text.to_string());
        }
        result
    }
}

/// Reader that plays back scripted fetch results, then returns nothing.
pub struct ScriptedReader {
    script: Mutex<VecDeque<Result<Vec<Item>, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedReader {
    pub fn new(script: Vec<Result<Vec<Item>, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceReader for ScriptedReader {
    async fn fetch(&self, _source: &SourceConfig) -> Result<Extraction, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new())).map(|items| Extraction {
            strategy: (!items.is_empty()).then(|| "scripted".to_string()),
            items,
        })
    }
}
