//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use edge_guard::config::GuardConfig;
use edge_guard::http::HttpServer;
use edge_guard::lifecycle::{build_guard, Shutdown};

/// A request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: String,
}

impl Captured {
    /// Path from the request line.
    pub fn path(&self) -> &str {
        self.head.split_whitespace().nth(1).unwrap_or("")
    }
}

/// Read one HTTP/1.1 request: head up to the blank line, then
/// `Content-Length` bytes of body.
async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break buf.len(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let end = buf.len().min(head_end + length);
    let body = String::from_utf8_lossy(&buf[head_end..end]).to_string();
    Captured { head, body }
}

async fn write_response(socket: &mut TcpStream, status: u16, content_type: &str, body: &str) {
    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        content_type,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a mock origin on an ephemeral port that always answers `response`.
pub async fn start_mock_origin(response: &'static str) -> SocketAddr {
    start_programmable_backend("text/plain", move |_| async move { (200, response.to_string()) }).await
}

/// Start a mock server whose reply is computed from each request.
pub async fn start_programmable_backend<F, Fut>(content_type: &'static str, f: F) -> SocketAddr
where
    F: Fn(Captured) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let (status, body) = f(request).await;
                        write_response(&mut socket, status, content_type, &body).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Start a mock JSON API that forwards every request it receives to the
/// returned channel and answers `{"ok":true}`.
pub async fn start_recording_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let addr = start_programmable_backend("application/json", move |request| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(request);
            (200, r#"{"ok":true}"#.to_string())
        }
    })
    .await;
    (addr, rx)
}

/// A running guard in front of a mock origin.
pub struct TestGuard {
    pub base_url: String,
    pub shutdown: Shutdown,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build the guard from `config` and serve it on an ephemeral port.
pub async fn spawn_guard(mut config: GuardConfig) -> TestGuard {
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;

    let shutdown = Shutdown::new();
    let guard = build_guard(&config, shutdown.subscribe()).await.unwrap();
    let server = HttpServer::new(config, guard).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGuard {
        base_url: format!("http://{}", addr),
        shutdown,
    }
}

/// Request builder with the headers a browser behind the edge would carry.
pub fn browser_get(client: &reqwest::Client, guard: &TestGuard, ip: &str) -> reqwest::RequestBuilder {
    client
        .get(format!("{}/", guard.base_url))
        .header("x-forwarded-for", ip)
        .header("user-agent", "Mozilla/5.0 (X11; Linux x86_64)")
}
