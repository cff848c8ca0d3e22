//! Reachability probes.
//!
//! A probe answers one question: can a TCP connection to `host:port` be
//! established within the timeout? No protocol-level validation is done.

use futures_util::future::BoxFuture;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;

/// Checks whether an address is reachable.
pub trait Probe: Send + Sync {
    fn probe<'a>(&'a self, authority: &'a str) -> BoxFuture<'a, bool>;
}

/// Bare TCP connect probe.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn connect(&self, authority: &str) -> bool {
        match time::timeout(self.timeout, TcpStream::connect(authority)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(addr = %authority, error = %e, "Site unreachable");
                false
            }
            Err(_) => {
                tracing::debug!(addr = %authority, timeout = ?self.timeout, "Site unreachable: connect timed out");
                false
            }
        }
    }
}

impl Probe for TcpProbe {
    fn probe<'a>(&'a self, authority: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(self.connect(authority))
    }
}
