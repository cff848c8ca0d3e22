//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{http::StatusCode, Router};
use failover_lb::config::ProxyConfig;
use failover_lb::lifecycle::Shutdown;
use failover_lb::load_balancer::ServerPool;
use failover_lb::HttpServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Start a mock backend answering every request with 200 and a fixed body.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_status_backend(StatusCode::OK, body).await
}

/// Start a mock backend answering every request with the given status and body.
pub async fn start_status_backend(status: StatusCode, body: &'static str) -> SocketAddr {
    serve(Router::new().fallback(move || async move { (status, body) })).await
}

/// Start a mock backend echoing the request body.
pub async fn start_echo_backend() -> SocketAddr {
    serve(Router::new().fallback(|body: String| async move { body })).await
}

/// An address nobody listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config with the given backends, health checks off and fast retries.
pub fn config_for(backends: &[SocketAddr]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.backends = backends.iter().map(|a| format!("http://{}", a)).collect();
    config.health_check.enabled = false;
    config.retries.retry_delay_ms = 1;
    config.timeouts.upstream_secs = 2;
    config
}

/// A running load balancer.
pub struct Proxy {
    pub addr: SocketAddr,
    pub pool: Arc<ServerPool>,
    pub shutdown: Shutdown,
}

impl Proxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> Proxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let pool = server.pool().clone();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Proxy { addr, pool, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Write a raw HTTP/1.1 request and return the response status line.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    while !buf.windows(2).any(|w| w == b"\r\n") {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&buf);
    text.lines().next().unwrap_or_default().to_string()
}

/// A `Transfer-Encoding: chunked` POST carrying `size` bytes in a single chunk.
pub fn chunked_post(size: usize) -> Vec<u8> {
    let mut request = format!(
        "POST / HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n",
        size
    )
    .into_bytes();
    request.extend(std::iter::repeat(b'x').take(size));
    request.extend_from_slice(b"\r\n0\r\n\r\n");
    request
}
